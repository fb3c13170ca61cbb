use super::ids::{SolverId, StoichId};
use super::object::ModelObject;

/// The compiled reaction system an object has been handed over to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverBinding {
    pub stoich: StoichId,
    pub ksolve: Option<SolverId>,
    pub dsolve: Option<SolverId>,
}

/// The protocol a model object implements to be taken over by a compiled reaction
/// system.
///
/// A bound object is *delegated*: its parameters live in the compiled representation
/// and it no longer runs on the generic scheduler. Unbinding returns it to native
/// control.
pub trait Delegable {
    fn bind_solver(&mut self, stoich: StoichId);

    fn unbind_solver(&mut self);

    /// Records the kinetic and diffusion solvers that evaluate the bound object.
    ///
    /// Has no effect on an unbound object.
    fn set_solver_pair(&mut self, ksolve: Option<SolverId>, dsolve: Option<SolverId>);

    fn binding(&self) -> Option<&SolverBinding>;

    fn is_delegated(&self) -> bool {
        self.binding().is_some()
    }

    fn is_delegated_to(&self, stoich: StoichId) -> bool {
        self.binding().is_some_and(|b| b.stoich == stoich)
    }
}

impl Delegable for ModelObject {
    fn bind_solver(&mut self, stoich: StoichId) {
        self.binding = Some(SolverBinding {
            stoich,
            ksolve: None,
            dsolve: None,
        });
    }

    fn unbind_solver(&mut self) {
        self.binding = None;
    }

    fn set_solver_pair(&mut self, ksolve: Option<SolverId>, dsolve: Option<SolverId>) {
        if let Some(binding) = self.binding.as_mut() {
            binding.ksolve = ksolve;
            binding.dsolve = dsolve;
        }
    }

    fn binding(&self) -> Option<&SolverBinding> {
        self.binding.as_ref()
    }
}
