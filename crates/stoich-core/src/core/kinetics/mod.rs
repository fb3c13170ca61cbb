//! # Kinetics Module
//!
//! Numeric evaluators that a compiled reaction system hands to its integrators.
//!
//! ## Overview
//!
//! - [`rate_term`] - The [`rate_term::RateTerm`] sum type: mass-action orders,
//!   Michaelis-Menten, bidirectional composites, stochastic variants and
//!   function-driven rates
//! - [`func_term`] - Algebraic terms that set a pool's value from other pools
//! - [`expr`] - JIT-compiled arithmetic expressions over `x0..xn` and time `t`
//!
//! All evaluators read a flat species vector `s` indexed by pool index.

pub mod expr;
pub mod func_term;
pub mod rate_term;

/// Avogadro's number, converting millimolar concentration times cubic metres into a
/// molecule count.
pub const NA: f64 = 6.0221415e23;
