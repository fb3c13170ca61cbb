//! # Workflows Module
//!
//! High-level entry points that take a model and a build configuration by name,
//! bind a reaction system to its compartment and solvers, compile it and summarize
//! the result.
//!
//! - **Compile Workflow** ([`compile`]) - Name resolution, compilation with progress
//!   reporting, and a serializable [`compile::CompileReport`].

pub mod compile;
