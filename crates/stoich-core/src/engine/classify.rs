use super::error::StoichError;
use super::proxy::{ForeignCompartments, ProxyMap, extract_compartments};
use crate::core::models::ids::{CompartmentId, ObjectId};
use crate::core::models::model::Model;
use crate::core::models::object::{ObjectKind, TargetMethod};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Model objects of one reaction system, partitioned by the role they play.
///
/// Every bucket is sorted and free of duplicates. A pool appears in at most one of
/// the pool buckets and the proxy map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub var_pools: Vec<ObjectId>,
    pub buf_pools: Vec<ObjectId>,
    /// Pools whose value is assigned by a function.
    pub func_target_pools: Vec<ObjectId>,
    pub reacs: Vec<ObjectId>,
    pub enzs: Vec<ObjectId>,
    pub mmenzs: Vec<ObjectId>,
    /// Functions assigning a pool value.
    pub pool_funcs: Vec<ObjectId>,
    /// Functions adding to a pool's rate of change.
    pub increment_funcs: Vec<ObjectId>,
    /// Functions driving a reaction's forward rate constant.
    pub reac_funcs: Vec<ObjectId>,
    pub off_solver_reacs: Vec<ObjectId>,
    pub off_solver_enzs: Vec<ObjectId>,
    pub off_solver_mmenzs: Vec<ObjectId>,
    /// Foreign compartments touched by each off-solver reaction.
    pub off_solver_compts: BTreeMap<ObjectId, ForeignCompartments>,
    pub proxies: ProxyMap,
}

impl Classification {
    /// Total number of distinct pools the system indexes.
    pub fn num_pools(&self) -> usize {
        self.var_pools.len()
            + self.buf_pools.len()
            + self.func_target_pools.len()
            + self.proxies.len()
    }

    /// Sorts and deduplicates every bucket and settles overlaps between them.
    ///
    /// A pool assigned by a function leaves the variable and buffered buckets; a
    /// foreign pool already indexed through the object list is not also a proxy.
    fn normalize(&mut self) {
        for bucket in [
            &mut self.var_pools,
            &mut self.buf_pools,
            &mut self.func_target_pools,
            &mut self.reacs,
            &mut self.enzs,
            &mut self.mmenzs,
            &mut self.pool_funcs,
            &mut self.increment_funcs,
            &mut self.reac_funcs,
            &mut self.off_solver_reacs,
            &mut self.off_solver_enzs,
            &mut self.off_solver_mmenzs,
        ] {
            bucket.sort_unstable();
            bucket.dedup();
        }

        let targets = &self.func_target_pools;
        self.var_pools
            .retain(|p| targets.binary_search(p).is_err());
        self.buf_pools
            .retain(|p| targets.binary_search(p).is_err());

        self.proxies.normalize();
        let local = [&self.var_pools, &self.buf_pools, &self.func_target_pools];
        self.proxies
            .retain(|p| local.iter().all(|bucket| bucket.binary_search(&p).is_err()));
    }
}

/// Partitions `elist` into the buckets of a reaction system anchored in `anchor`.
///
/// Stale handles and objects of kinds the compiler does not handle are dropped.
pub fn classify(
    model: &Model,
    anchor: CompartmentId,
    elist: &[ObjectId],
) -> Result<Classification, StoichError> {
    let mut c = Classification::default();

    for &id in elist {
        let Some(obj) = model.object(id) else {
            debug!(object = ?id, "Dropping stale object handle from reaction system.");
            continue;
        };

        match &obj.kind {
            ObjectKind::Pool(pool) if pool.buffered => c.buf_pools.push(id),
            ObjectKind::Pool(_) => c.var_pools.push(id),
            ObjectKind::Reac(_) | ObjectKind::Enz(_) | ObjectKind::MMEnz(_) => {
                let off_solver = classify_reaction(model, anchor, id, &obj.kind, &mut c)?;
                let bucket = match (&obj.kind, off_solver) {
                    (ObjectKind::Reac(_), false) => &mut c.reacs,
                    (ObjectKind::Reac(_), true) => &mut c.off_solver_reacs,
                    (ObjectKind::Enz(_), false) => &mut c.enzs,
                    (ObjectKind::Enz(_), true) => &mut c.off_solver_enzs,
                    (_, false) => &mut c.mmenzs,
                    (_, true) => &mut c.off_solver_mmenzs,
                };
                bucket.push(id);
            }
            ObjectKind::Function(func) => match func.primary_method() {
                Some(TargetMethod::Increment) => c.increment_funcs.push(id),
                Some(TargetMethod::SetNumKf) => c.reac_funcs.push(id),
                _ => {
                    let pool_targets: Vec<ObjectId> = func
                        .outputs
                        .iter()
                        .map(|o| o.target)
                        .filter(|&t| model.pool(t).is_some())
                        .collect();
                    if func.outputs.len() != 1 || pool_targets.len() != 1 {
                        return Err(StoichError::FunctionTarget {
                            path: model.path_of(id).unwrap_or_default(),
                            found: pool_targets.len(),
                        });
                    }
                    c.pool_funcs.push(id);
                    c.func_target_pools.push(pool_targets[0]);
                }
            },
            ObjectKind::Other { class } => {
                debug!(object = %obj.name, class = %class, "Ignoring object of unhandled kind.");
            }
        }
    }

    c.normalize();
    Ok(c)
}

/// Records the foreign pools of a reaction-like object into the proxy map.
///
/// Returns whether the reaction crosses out of `anchor`.
fn classify_reaction(
    model: &Model,
    anchor: CompartmentId,
    id: ObjectId,
    kind: &ObjectKind,
    c: &mut Classification,
) -> Result<bool, StoichError> {
    let Some((subs, prds)) = kind.reactant_neighbors() else {
        return Ok(false);
    };

    let mut foreign = Vec::new();
    for &pool in subs.iter().chain(prds) {
        let Some(compt) = model.compartment_of(pool) else {
            continue;
        };
        if compt == anchor {
            continue;
        }
        if model.pool(pool).is_some_and(|p| p.buffered) {
            warn!(
                reaction = %model.path_of(id).unwrap_or_default(),
                pool = %model.path_of(pool).unwrap_or_default(),
                "Buffered pool participates in a cross-compartment reaction."
            );
        }
        c.proxies.insert(compt, pool);
        foreign.push(compt);
    }

    match extract_compartments(&foreign) {
        Ok(None) => Ok(false),
        Ok(Some(pair)) => {
            c.off_solver_compts.insert(id, pair);
            Ok(true)
        }
        Err(found) => Err(StoichError::TooManyCompartments {
            path: model.path_of(id).unwrap_or_default(),
            found,
        }),
    }
}
