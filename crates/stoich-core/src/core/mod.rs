//! # Core Module
//!
//! The stateless building blocks of the reaction-network compiler.
//!
//! ## Architecture
//!
//! - **Model Graph** ([`models`]) - Compartments, solvers and the typed kinetic objects
//!   (pools, reactions, enzymes, functions) stored in slot-map arenas
//! - **File I/O** ([`io`]) - Reading declarative model definitions from TOML files
//! - **Kinetics** ([`kinetics`]) - The rate-term sum type, algebraic function terms and
//!   compiled expressions evaluated by numeric integrators
//! - **Linear Algebra** ([`math`]) - The sparse stoichiometry matrix
//!
//! Nothing in this module knows about compilation order or delegation state beyond the
//! plain data it stores; that logic lives in [`crate::engine`].

pub mod io;
pub mod kinetics;
pub mod math;
pub mod models;
