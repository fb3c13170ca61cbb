//! # Core Models Module
//!
//! The model graph that the reaction-system compiler walks.
//!
//! ## Overview
//!
//! A [`model::Model`] owns every compartment, solver handle and kinetic object of a
//! simulation session. Objects are addressed by stable, generation-stamped handles
//! ([`ids`]) so that a handle kept across a teardown/rebuild cycle can never alias a
//! different object.
//!
//! ## Key Components
//!
//! - [`ids`] - Handle types for objects, compartments, solvers and compiled systems
//! - [`compartment`] - Spatial regions and their voxel volumes
//! - [`object`] - The closed set of kinetic object kinds and their parameters
//! - [`delegate`] - The delegation protocol objects implement to accept a solver
//! - [`schedule`] - Scheduler tick slots and the registry of per-kind defaults
//! - [`solver`] - Handles for the external numeric solvers
//! - [`wildcard`] - Path pattern matching used to select reaction systems
//! - [`model`] - The arena owning all of the above
//!
//! ## Usage
//!
//! ```ignore
//! use stoichkit::core::models::model::Model;
//!
//! let mut model = Model::new();
//! let cyt = model.add_compartment("cyt", vec![1e-18]);
//! let a = model.add_pool(cyt, "A", 0.1)?;
//! let b = model.add_pool(cyt, "B", 0.0)?;
//! let r = model.add_reac(cyt, "r", 2.0, 0.0, vec![a], vec![b])?;
//! ```

pub mod compartment;
pub mod delegate;
pub mod ids;
pub mod model;
pub mod object;
pub mod schedule;
pub mod solver;
pub mod wildcard;
