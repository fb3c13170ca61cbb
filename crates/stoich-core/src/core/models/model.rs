use super::compartment::Compartment;
use super::ids::{CompartmentId, ObjectId, SolverId, StoichId};
use super::object::{Enz, Function, MMEnz, ModelObject, ObjectKind, Pool, Reac};
use super::schedule::ScheduleRegistry;
use super::solver::{Solver, SolverKind};
use super::wildcard;
use crate::core::kinetics::NA;
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("An object already exists at path '{0}'")]
    DuplicatePath(String),

    #[error("A solver named '{0}' already exists")]
    DuplicateSolver(String),

    #[error("Compartment not found: {0:?}")]
    CompartmentNotFound(CompartmentId),

    #[error("Object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("Object '{path}' is not a {expected}")]
    WrongKind { path: String, expected: &'static str },
}

/// The arena owning every compartment, solver handle and kinetic object of a session.
///
/// Objects are addressed by path `/<compartment>/<name>`, and by handle once created.
/// Removing an object invalidates its handle; stale handles simply resolve to `None`.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Primary storage for kinetic and auxiliary objects.
    objects: SlotMap<ObjectId, ModelObject>,
    compartments: SlotMap<CompartmentId, Compartment>,
    solvers: SlotMap<SolverId, Solver>,
    /// Names of the compiled reaction systems registered against this model.
    stoichs: SlotMap<StoichId, String>,
    /// Lookup map from full object path to handle.
    path_map: HashMap<String, ObjectId>,
    compartment_map: HashMap<String, CompartmentId>,
    solver_map: HashMap<String, SolverId>,
    schedule: ScheduleRegistry,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a compartment or returns the existing one with the same name.
    ///
    /// The voxel volumes of an existing compartment are left untouched.
    pub fn add_compartment(&mut self, name: &str, voxel_volumes: Vec<f64>) -> CompartmentId {
        *self
            .compartment_map
            .entry(name.to_string())
            .or_insert_with(|| {
                self.compartments
                    .insert(Compartment::new(name, voxel_volumes))
            })
    }

    pub fn compartment(&self, id: CompartmentId) -> Option<&Compartment> {
        self.compartments.get(id)
    }

    pub fn compartment_mut(&mut self, id: CompartmentId) -> Option<&mut Compartment> {
        self.compartments.get_mut(id)
    }

    pub fn compartments_iter(&self) -> impl Iterator<Item = (CompartmentId, &Compartment)> {
        self.compartments.iter()
    }

    pub fn find_compartment(&self, name: &str) -> Option<CompartmentId> {
        self.compartment_map.get(name).copied()
    }

    pub fn add_solver(&mut self, name: &str, kind: SolverKind) -> Result<SolverId, ModelError> {
        if self.solver_map.contains_key(name) {
            return Err(ModelError::DuplicateSolver(name.to_string()));
        }
        let id = self.solvers.insert(Solver::new(name, kind));
        self.solver_map.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn solver(&self, id: SolverId) -> Option<&Solver> {
        self.solvers.get(id)
    }

    pub fn find_solver(&self, name: &str) -> Option<SolverId> {
        self.solver_map.get(name).copied()
    }

    /// Issues a handle for a new compiled reaction system.
    pub fn register_stoich(&mut self, name: &str) -> StoichId {
        self.stoichs.insert(name.to_string())
    }

    pub fn stoich_name(&self, id: StoichId) -> Option<&str> {
        self.stoichs.get(id).map(String::as_str)
    }

    pub fn schedule(&self) -> &ScheduleRegistry {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut ScheduleRegistry {
        &mut self.schedule
    }

    /// Inserts an object into a compartment, placing it on its kind's default tick.
    pub fn add_object(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        kind: ObjectKind,
    ) -> Result<ObjectId, ModelError> {
        let compt = self
            .compartments
            .get(compartment)
            .ok_or(ModelError::CompartmentNotFound(compartment))?;
        let path = format!("/{}/{}", compt.name, name);
        if self.path_map.contains_key(&path) {
            return Err(ModelError::DuplicatePath(path));
        }

        let tick = self.schedule.default_tick(kind.class_name());
        let id = self
            .objects
            .insert(ModelObject::new(name, compartment, kind, tick));
        self.path_map.insert(path, id);
        Ok(id)
    }

    /// Adds a free pool; its native molecule count starts at the first voxel's
    /// equivalent of `conc_init`.
    pub fn add_pool(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        conc_init: f64,
    ) -> Result<ObjectId, ModelError> {
        self.insert_pool(compartment, name, Pool::new(conc_init, false))
    }

    pub fn add_buf_pool(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        conc_init: f64,
    ) -> Result<ObjectId, ModelError> {
        self.insert_pool(compartment, name, Pool::new(conc_init, true))
    }

    fn insert_pool(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        mut pool: Pool,
    ) -> Result<ObjectId, ModelError> {
        let volume = self
            .compartments
            .get(compartment)
            .map(|c| c.volume(0))
            .ok_or(ModelError::CompartmentNotFound(compartment))?;
        pool.n = pool.conc_init * NA * volume;
        self.add_object(compartment, name, ObjectKind::Pool(pool))
    }

    pub fn add_reac(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        kf: f64,
        kb: f64,
        substrates: Vec<ObjectId>,
        products: Vec<ObjectId>,
    ) -> Result<ObjectId, ModelError> {
        let reac = Reac {
            kf,
            kb,
            substrates,
            products,
        };
        self.add_object(compartment, name, ObjectKind::Reac(reac))
    }

    pub fn add_enz(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        enz: Enz,
    ) -> Result<ObjectId, ModelError> {
        self.add_object(compartment, name, ObjectKind::Enz(enz))
    }

    pub fn add_mmenz(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        enz: MMEnz,
    ) -> Result<ObjectId, ModelError> {
        self.add_object(compartment, name, ObjectKind::MMEnz(enz))
    }

    pub fn add_function(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        function: Function,
    ) -> Result<ObjectId, ModelError> {
        self.add_object(compartment, name, ObjectKind::Function(function))
    }

    /// Adds an object of a kind the reaction compiler ignores.
    pub fn add_other(
        &mut self,
        compartment: CompartmentId,
        name: &str,
        class: &str,
    ) -> Result<ObjectId, ModelError> {
        let kind = ObjectKind::Other {
            class: class.to_string(),
        };
        self.add_object(compartment, name, kind)
    }

    /// Removes an object from the model, returning it if it existed.
    ///
    /// References to the object held by reactions or functions are left dangling on
    /// purpose; the compiler treats them as unresolved.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<ModelObject> {
        let path = self.path_of(id)?;
        self.path_map.remove(&path);
        self.objects.remove(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&ModelObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut ModelObject> {
        self.objects.get_mut(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn objects_iter(&self) -> impl Iterator<Item = (ObjectId, &ModelObject)> {
        self.objects.iter()
    }

    pub fn pool(&self, id: ObjectId) -> Option<&Pool> {
        self.objects.get(id)?.as_pool()
    }

    pub fn reac(&self, id: ObjectId) -> Option<&Reac> {
        self.objects.get(id)?.as_reac()
    }

    pub fn enz(&self, id: ObjectId) -> Option<&Enz> {
        self.objects.get(id)?.as_enz()
    }

    pub fn mmenz(&self, id: ObjectId) -> Option<&MMEnz> {
        self.objects.get(id)?.as_mmenz()
    }

    pub fn function(&self, id: ObjectId) -> Option<&Function> {
        self.objects.get(id)?.as_function()
    }

    /// The compartment an object lives in.
    pub fn compartment_of(&self, id: ObjectId) -> Option<CompartmentId> {
        self.objects.get(id).map(|o| o.compartment)
    }

    /// Volume of the voxel of the object's compartment.
    pub fn object_volume(&self, id: ObjectId, voxel: usize) -> Option<f64> {
        let compt = self.compartment_of(id)?;
        self.compartments.get(compt).map(|c| c.volume(voxel))
    }

    pub fn path_of(&self, id: ObjectId) -> Option<String> {
        let obj = self.objects.get(id)?;
        let compt = self.compartments.get(obj.compartment)?;
        Some(format!("/{}/{}", compt.name, obj.name))
    }

    pub fn find_by_path(&self, path: &str) -> Option<ObjectId> {
        self.path_map.get(path).copied()
    }

    /// All objects whose path matches the wildcard pattern, in path order.
    pub fn wildcard_find(&self, pattern: &str) -> Vec<ObjectId> {
        let mut found: Vec<(&String, ObjectId)> = self
            .path_map
            .iter()
            .filter(|(path, _)| wildcard::matches(pattern, path))
            .map(|(path, id)| (path, *id))
            .collect();
        found.sort_unstable_by(|a, b| a.0.cmp(b.0));
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Sets the initial concentration of a pool from a molecule count in the given
    /// voxel volume.
    pub fn set_pool_n_init(&mut self, id: ObjectId, n_init: f64) -> Result<(), ModelError> {
        let volume = self
            .object_volume(id, 0)
            .ok_or(ModelError::ObjectNotFound(id))?;
        let path = self.path_of(id).unwrap_or_default();
        let pool = self
            .objects
            .get_mut(id)
            .and_then(ModelObject::as_pool_mut)
            .ok_or(ModelError::WrongKind {
                path,
                expected: "pool",
            })?;
        pool.conc_init = n_init / (NA * volume);
        pool.n = n_init;
        Ok(())
    }
}
