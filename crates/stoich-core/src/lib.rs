//! # stoichkit
//!
//! A library that compiles declarative chemical reaction networks into the compact
//! numeric form consumed by deterministic, stochastic and diffusive kinetic solvers.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The model graph (`Model`) of pools, reactions, enzymes
//!   and functions stored in generation-stamped arenas, the numeric rate-term family
//!   (`RateTerm`, `FuncTerm`), the sparse stoichiometry matrix, and model file I/O.
//!
//! - **[`engine`]: The Compiler.** The stateful `Stoich` that classifies model objects,
//!   allocates dense indices, installs rate terms into the stoichiometry matrix, manages
//!   cross-compartment proxy pools and delegates ("zombifies") model objects to the
//!   compiled representation.
//!
//! - **[`workflows`]: The Public API.** High-level procedures that bind a `Stoich` to a
//!   compartment and its solvers, compile a reaction system and summarise the result.

pub mod core;
pub mod engine;
pub mod workflows;
