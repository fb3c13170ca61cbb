//! Reading declarative model definitions.
//!
//! Models are described in TOML as arrays of compartment, solver, pool, reaction,
//! enzyme and function tables; [`model_file`] turns such a file into a
//! [`crate::core::models::model::Model`].

pub mod model_file;
