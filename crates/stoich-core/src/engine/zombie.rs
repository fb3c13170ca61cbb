use super::error::StoichError;
use super::stoich::Stoich;
use crate::core::kinetics::NA;
use crate::core::models::delegate::Delegable;
use crate::core::models::ids::{ObjectId, SolverId, StoichId};
use crate::core::models::model::{Model, ModelError};
use crate::core::models::object::ObjectKind;
use crate::core::models::schedule::{ScheduleRegistry, Tick};
use tracing::{debug, warn};

/// Hands `objects` over to a compiled reaction system.
///
/// Each object is bound to `stoich`, records the solver pair and leaves the generic
/// scheduler. An object still bound to another system is released from it first.
pub fn zombify(
    model: &mut Model,
    objects: &[ObjectId],
    stoich: StoichId,
    ksolve: Option<SolverId>,
    dsolve: Option<SolverId>,
) {
    for &id in objects {
        let Some(obj) = model.object_mut(id) else {
            continue;
        };
        if obj.is_delegated() && !obj.is_delegated_to(stoich) {
            warn!(object = %obj.name, "Object is bound to another reaction system; rebinding.");
            obj.unbind_solver();
        }
        obj.bind_solver(stoich);
        obj.set_solver_pair(ksolve, dsolve);
        obj.set_tick(Tick::Disabled);
    }
}

/// Returns `objects` delegated to `stoich` to native control.
///
/// Removed objects and objects since taken over by another system are skipped. A
/// disabled tick is restored to the kind's default from `schedule`.
pub fn unzombify(
    model: &mut Model,
    objects: &[ObjectId],
    stoich: StoichId,
    schedule: &ScheduleRegistry,
) {
    for &id in objects {
        let Some(obj) = model.object_mut(id) else {
            debug!(object = ?id, "Skipping removed object during teardown.");
            continue;
        };
        if !obj.is_delegated_to(stoich) {
            continue;
        }
        obj.unbind_solver();
        if obj.tick().is_disabled() {
            let tick = schedule.default_tick(obj.class_name());
            obj.set_tick(tick);
        }
    }
}

/// Parameter access that follows delegation.
///
/// Reads come from the compiled system while an object is delegated to it, and from
/// the model object otherwise. Writes always update the model object, and also the
/// compiled system when delegated, so a later teardown keeps the latest values.
pub struct Zombie<'a> {
    model: &'a mut Model,
    stoich: &'a mut Stoich,
}

impl<'a> Zombie<'a> {
    pub fn new(model: &'a mut Model, stoich: &'a mut Stoich) -> Self {
        Self { model, stoich }
    }

    pub fn is_delegated(&self, id: ObjectId) -> bool {
        self.model
            .object(id)
            .is_some_and(|o| o.is_delegated_to(self.stoich.id()))
    }

    fn read(
        &self,
        id: ObjectId,
        native: impl FnOnce(&ObjectKind) -> Option<f64>,
        compiled: impl FnOnce(&Stoich) -> Option<f64>,
    ) -> Option<f64> {
        if self.is_delegated(id) {
            compiled(&*self.stoich)
        } else {
            self.model.object(id).and_then(|o| native(&o.kind))
        }
    }

    fn write(
        &mut self,
        id: ObjectId,
        expected: &'static str,
        native: impl FnOnce(&mut ObjectKind) -> bool,
        compiled: impl FnOnce(&mut Stoich) -> Result<(), StoichError>,
    ) -> Result<(), StoichError> {
        let delegated = self.is_delegated(id);
        let path = self.model.path_of(id).unwrap_or_default();
        let obj = self
            .model
            .object_mut(id)
            .ok_or(StoichError::ObjectNotFound(id))?;
        if !native(&mut obj.kind) {
            return Err(ModelError::WrongKind { path, expected }.into());
        }
        if delegated {
            compiled(&mut *self.stoich)?;
        }
        Ok(())
    }

    pub fn kf(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Reac(r) => Some(r.kf),
                _ => None,
            },
            |s| s.reac_kf(id),
        )
    }

    pub fn set_kf(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "reaction",
            |k| match k {
                ObjectKind::Reac(r) => {
                    r.kf = value;
                    true
                }
                _ => false,
            },
            |s| s.set_reac_kf(id, value),
        )
    }

    pub fn kb(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Reac(r) => Some(r.kb),
                _ => None,
            },
            |s| s.reac_kb(id),
        )
    }

    pub fn set_kb(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "reaction",
            |k| match k {
                ObjectKind::Reac(r) => {
                    r.kb = value;
                    true
                }
                _ => false,
            },
            |s| s.set_reac_kb(id, value),
        )
    }

    pub fn k1(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Enz(e) => Some(e.k1),
                _ => None,
            },
            |s| s.enz_k1(id),
        )
    }

    pub fn set_k1(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "enzyme",
            |k| match k {
                ObjectKind::Enz(e) => {
                    e.k1 = value;
                    true
                }
                _ => false,
            },
            |s| s.set_enz_k1(id, value),
        )
    }

    pub fn k2(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Enz(e) => Some(e.k2),
                _ => None,
            },
            |s| s.enz_k2(id),
        )
    }

    pub fn set_k2(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "enzyme",
            |k| match k {
                ObjectKind::Enz(e) => {
                    e.k2 = value;
                    true
                }
                _ => false,
            },
            |s| s.set_enz_k2(id, value),
        )
    }

    pub fn k3(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Enz(e) => Some(e.k3),
                _ => None,
            },
            |s| s.enz_k3(id),
        )
    }

    pub fn set_k3(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "enzyme",
            |k| match k {
                ObjectKind::Enz(e) => {
                    e.k3 = value;
                    true
                }
                _ => false,
            },
            |s| s.set_enz_k3(id, value),
        )
    }

    pub fn km(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::MMEnz(e) => Some(e.km),
                _ => None,
            },
            |s| s.mmenz_km(id),
        )
    }

    pub fn set_km(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "Michaelis-Menten enzyme",
            |k| match k {
                ObjectKind::MMEnz(e) => {
                    e.km = value;
                    true
                }
                _ => false,
            },
            |s| s.set_mmenz_km(id, value),
        )
    }

    pub fn kcat(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::MMEnz(e) => Some(e.kcat),
                _ => None,
            },
            |s| s.mmenz_kcat(id),
        )
    }

    pub fn set_kcat(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "Michaelis-Menten enzyme",
            |k| match k {
                ObjectKind::MMEnz(e) => {
                    e.kcat = value;
                    true
                }
                _ => false,
            },
            |s| s.set_mmenz_kcat(id, value),
        )
    }

    /// Molecule count of a pool, in the first voxel when delegated.
    pub fn n(&self, id: ObjectId) -> Option<f64> {
        self.read(
            id,
            |k| match k {
                ObjectKind::Pool(p) => Some(p.n),
                _ => None,
            },
            |s| s.pool_n(id, 0),
        )
    }

    pub fn set_n(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "pool",
            |k| match k {
                ObjectKind::Pool(p) => {
                    p.n = value;
                    true
                }
                _ => false,
            },
            |s| s.set_pool_n(id, 0, value),
        )
    }

    pub fn conc_init(&self, id: ObjectId) -> Option<f64> {
        let native = self.model.pool(id).map(|p| p.conc_init);
        if !self.is_delegated(id) {
            return native;
        }
        let volume = self.model.object_volume(id, 0)?;
        self.stoich
            .pool_n_init(id, 0)
            .map(|n_init| n_init / (NA * volume))
            .or(native)
    }

    pub fn set_conc_init(&mut self, id: ObjectId, value: f64) -> Result<(), StoichError> {
        self.write(
            id,
            "pool",
            |k| match k {
                ObjectKind::Pool(p) => {
                    p.conc_init = value;
                    true
                }
                _ => false,
            },
            |s| s.set_pool_conc_init(id, value),
        )
    }

    /// Replaces a function's expression on the model object and in the compiled system.
    pub fn set_function_expr(&mut self, id: ObjectId, expr: &str) -> Result<(), StoichError> {
        let delegated = self.is_delegated(id);
        let path = self.model.path_of(id).unwrap_or_default();
        let func = self
            .model
            .object_mut(id)
            .ok_or(StoichError::ObjectNotFound(id))?
            .as_function_mut()
            .ok_or_else(|| ModelError::WrongKind {
                path,
                expected: "function",
            })?;
        func.expr = expr.to_string();
        if delegated {
            self.stoich.set_function_expr(id, expr)?;
        }
        Ok(())
    }
}
