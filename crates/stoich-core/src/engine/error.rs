use thiserror::Error;

use crate::core::kinetics::expr::ExprError;
use crate::core::models::ids::{CompartmentId, ObjectId, SolverId};
use crate::core::models::model::ModelError;

#[derive(Debug, Error)]
pub enum StoichError {
    #[error("Compartment not found in model: {0:?}")]
    CompartmentNotFound(CompartmentId),

    #[error("Solver {solver:?} cannot be used as a {role} solver")]
    InvalidSolver {
        solver: SolverId,
        role: &'static str,
    },

    #[error("Object not found in model: {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("Object '{path}' is not part of the compiled reaction system")]
    NotInstalled { path: String },

    #[error("Object {0:?} has no slot in the compiled reaction system")]
    NotIndexed(ObjectId),

    #[error("Pool {pool:?} referenced by '{path}' has no index in the compiled system")]
    UnresolvedPool { path: String, pool: ObjectId },

    #[error("Function '{path}' declares {expected} variables but has {found} inputs")]
    ArgumentMismatch {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("Function '{path}' must target exactly one pool, found {found}")]
    FunctionTarget { path: String, found: usize },

    #[error("Reaction '{path}' touches {found} foreign compartments; at most 2 are supported")]
    TooManyCompartments { path: String, found: usize },

    #[error("Voxel {voxel} out of range; the compartment has {num_voxels}")]
    VoxelOutOfRange { voxel: usize, num_voxels: usize },

    #[error("Expression error: {source}")]
    Expression {
        #[from]
        source: ExprError,
    },

    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },
}
