//! Linear-algebra support for compiled reaction systems.
//!
//! - [`sparse`] - Compressed sparse row matrices, used for the stoichiometry matrix

pub mod sparse;
