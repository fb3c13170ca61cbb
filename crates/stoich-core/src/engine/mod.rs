//! # Engine Module
//!
//! This module implements the reaction-system compiler: the stateful [`stoich::Stoich`]
//! that turns a set of model objects into the dense numeric form kinetic solvers
//! integrate.
//!
//! ## Overview
//!
//! A compilation runs in fixed stages. Objects are first sorted into kinetic
//! buckets, then every pool and rate term receives a dense index, the rate terms and
//! the stoichiometry matrix are installed, and finally the model objects are
//! delegated to the compiled system so the native objects stop computing on their
//! own. Tearing a system down reverses the delegation and restores their schedules.
//!
//! ## Architecture
//!
//! - **Classification** ([`classify`]) - Sorting objects into pools, reactions,
//!   enzymes, functions and their cross-compartment variants
//! - **Proxies** ([`proxy`]) - Foreign pools that reactions reach into, grouped by the
//!   compartment that owns them
//! - **Index Allocation** ([`allocate`]) - Dense pool and rate-slot numbering
//! - **Installation** ([`install`]) - Rate terms, function terms and the stoichiometry
//!   matrix
//! - **Voxel State** ([`voxel`]) - Per-voxel counts and volume-scaled rate terms
//! - **Delegation** ([`zombie`]) - Handing objects to the compiled system and back,
//!   plus parameter access routed through it
//! - **Configuration** ([`config`]), **Status** ([`status`]), **Progress**
//!   ([`progress`]) and **Errors** ([`error`])

pub mod allocate;
pub mod classify;
pub mod config;
pub mod error;
pub mod install;
pub mod progress;
pub mod proxy;
pub mod status;
pub mod stoich;
pub mod voxel;
pub mod zombie;
