use super::allocate::{IndexLayout, allocate};
use super::classify::{Classification, classify};
use super::config::StoichConfig;
use super::error::StoichError;
use super::install::{Installation, install};
use super::proxy::OffCoreCompartments;
use super::status::Status;
use super::voxel::VoxelPools;
use super::zombie::{unzombify, zombify};
use crate::core::kinetics::NA;
use crate::core::kinetics::expr::Expression;
use crate::core::kinetics::func_term::FuncTerm;
use crate::core::kinetics::rate_term::RateTerm;
use crate::core::math::sparse::SparseMatrix;
use crate::core::models::ids::{CompartmentId, ObjectId, SolverId, StoichId};
use crate::core::models::model::Model;
use crate::core::models::solver::SolverKind;
use tracing::{debug, info, instrument, warn};

/// A compiled reaction system anchored in one compartment.
///
/// Binding a compartment and at least one solver, then handing over an object list
/// (directly or through a wildcard path), classifies the objects, assigns dense
/// indices, builds the rate terms and the stoichiometry matrix, and delegates the
/// objects to this system. Recompiling tears the previous build down first.
#[derive(Debug, Clone)]
pub struct Stoich {
    id: StoichId,
    name: String,
    config: StoichConfig,
    one_way: bool,
    stochastic: bool,
    compartment: Option<CompartmentId>,
    ksolve: Option<SolverId>,
    dsolve: Option<SolverId>,
    path: String,
    status: Status,
    classification: Classification,
    layout: IndexLayout,
    installed: Installation,
    delegated: Vec<ObjectId>,
    voxels: Vec<VoxelPools>,
}

impl Stoich {
    pub fn new(model: &mut Model, name: &str, config: StoichConfig) -> Self {
        let one_way = config.one_way.unwrap_or(false);
        Self {
            id: model.register_stoich(name),
            name: name.to_string(),
            config,
            one_way,
            stochastic: false,
            compartment: None,
            ksolve: None,
            dsolve: None,
            path: String::new(),
            status: Status::UNCOMPILED,
            classification: Classification::default(),
            layout: IndexLayout::default(),
            installed: Installation::default(),
            delegated: Vec::new(),
            voxels: Vec::new(),
        }
    }

    pub fn id(&self) -> StoichId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &StoichConfig {
        &self.config
    }

    pub fn set_compartment(
        &mut self,
        model: &Model,
        compartment: CompartmentId,
    ) -> Result<(), StoichError> {
        if model.compartment(compartment).is_none() {
            return Err(StoichError::CompartmentNotFound(compartment));
        }
        self.compartment = Some(compartment);
        Ok(())
    }

    pub fn compartment(&self) -> Option<CompartmentId> {
        self.compartment
    }

    /// Binds the kinetic solver.
    ///
    /// A stochastic solver switches reversible reactions to one-way terms unless the
    /// configuration fixes the mode. A solver that cannot integrate kinetics is
    /// rejected and clears the binding.
    pub fn set_ksolve(&mut self, model: &Model, solver: SolverId) -> Result<(), StoichError> {
        let kind = model.solver(solver).map(|s| s.kind);
        match kind {
            Some(kind) if kind.is_kinetic() => {
                self.ksolve = Some(solver);
                self.stochastic = kind.is_stochastic();
                self.one_way = self.config.one_way.unwrap_or(self.stochastic);
                Ok(())
            }
            _ => {
                self.ksolve = None;
                self.stochastic = false;
                Err(StoichError::InvalidSolver {
                    solver,
                    role: "kinetic",
                })
            }
        }
    }

    pub fn set_dsolve(&mut self, model: &Model, solver: SolverId) -> Result<(), StoichError> {
        match model.solver(solver).map(|s| s.kind) {
            Some(SolverKind::Dsolve) => {
                self.dsolve = Some(solver);
                Ok(())
            }
            _ => {
                self.dsolve = None;
                Err(StoichError::InvalidSolver {
                    solver,
                    role: "diffusion",
                })
            }
        }
    }

    pub fn ksolve(&self) -> Option<SolverId> {
        self.ksolve
    }

    pub fn dsolve(&self) -> Option<SolverId> {
        self.dsolve
    }

    /// Whether reversible reactions are split into separate forward and reverse terms.
    pub fn one_way(&self) -> bool {
        self.one_way
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Compiles every object matched by a wildcard path such as `/cyt/##`.
    pub fn set_reac_system_path(
        &mut self,
        model: &mut Model,
        path: &str,
    ) -> Result<Status, StoichError> {
        self.path = path.to_string();
        let elist = model.wildcard_find(path);
        debug!(path, found = elist.len(), "Resolved reaction system path.");
        self.set_elist(model, &elist)
    }

    /// Compiles an explicit object list.
    ///
    /// A missing compartment, missing solvers or an empty list only set the status
    /// and leave any previous build in place. Any other failure tears the system down
    /// and leaves it uncompiled.
    #[instrument(skip_all, name = "stoich_compile", fields(stoich = %self.name))]
    pub fn set_elist(
        &mut self,
        model: &mut Model,
        elist: &[ObjectId],
    ) -> Result<Status, StoichError> {
        let Some(compartment) = self.compartment else {
            warn!("No compartment bound; nothing compiled.");
            self.status = Status::NO_COMPARTMENT;
            return Ok(self.status);
        };
        if self.ksolve.is_none() && self.dsolve.is_none() {
            warn!("Neither a kinetic nor a diffusion solver is bound; nothing compiled.");
            self.status = Status::NO_SOLVER;
            return Ok(self.status);
        }
        let elist: Vec<ObjectId> = elist
            .iter()
            .copied()
            .filter(|&id| model.object(id).is_some_and(|o| o.kind.is_kinetic()))
            .collect();
        if elist.is_empty() {
            warn!("No kinetic objects in the reaction system; nothing compiled.");
            self.status = Status::NOTHING_ON_PATH;
            return Ok(self.status);
        }

        self.unzombify_model(model);
        match self.build(model, compartment, &elist) {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!(error = %e, "Compilation failed; tearing down.");
                self.unzombify_model(model);
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        model: &mut Model,
        compartment: CompartmentId,
        elist: &[ObjectId],
    ) -> Result<Status, StoichError> {
        self.classification = classify(model, compartment, elist)?;
        self.layout = allocate(&self.classification, self.one_way);
        info!(
            var_pools = self.layout.num_var_pools(),
            buf_pools = self.layout.num_buf_pools(),
            func_pools = self.layout.num_func_pools(),
            proxy_pools = self.layout.num_proxy_pools(),
            rates = self.layout.num_rates(),
            "Allocated reaction system indices."
        );

        self.installed = install(model, &self.classification, &self.layout, self.stochastic)?;

        self.delegated = delegated_objects(&self.classification);
        zombify(model, &self.delegated, self.id, self.ksolve, self.dsolve);

        self.voxels = self.build_voxels(model, compartment);
        self.status = self.installed.status;
        info!(
            status = %self.status,
            voxels = self.voxels.len(),
            nnz = self.installed.matrix.nnz(),
            "Reaction system compiled."
        );
        Ok(self.status)
    }

    fn build_voxels(&self, model: &Model, compartment: CompartmentId) -> Vec<VoxelPools> {
        let Some(compt) = model.compartment(compartment) else {
            return Vec::new();
        };
        let pools = self.layout.pools();
        let is_local: Vec<bool> = pools
            .iter()
            .map(|&p| model.compartment_of(p) == Some(compartment))
            .collect();
        let buf_start = self.layout.num_all_pools() - self.layout.num_buf_pools();
        let is_buffered: Vec<bool> = (0..pools.len()).map(|i| i >= buf_start).collect();

        (0..compt.num_voxels())
            .map(|v| {
                let volume = compt.volume(v);
                let pool_volumes: Vec<f64> = pools
                    .iter()
                    .map(|&p| model.object_volume(p, v).unwrap_or(volume))
                    .collect();
                let n_init: Vec<f64> = pools
                    .iter()
                    .zip(&pool_volumes)
                    .map(|(&p, vol)| model.pool(p).map_or(0.0, |pool| pool.conc_init) * NA * vol)
                    .collect();
                let mut voxel = VoxelPools::new(
                    volume,
                    pool_volumes,
                    is_local.clone(),
                    is_buffered.clone(),
                    n_init,
                    self.config.allow_negative,
                );
                voxel.refresh_rates(&self.installed.rates);
                voxel
            })
            .collect()
    }

    /// Returns every delegated object to native control and discards the build.
    pub fn unzombify_model(&mut self, model: &mut Model) {
        unzombify(model, &self.delegated, self.id, &self.config.schedule);
        self.delegated.clear();
        self.classification = Classification::default();
        self.layout = IndexLayout::default();
        self.installed = Installation::default();
        self.voxels.clear();
        self.status = Status::UNCOMPILED;
    }

    pub fn num_var_pools(&self) -> usize {
        self.layout.num_var_pools()
    }

    pub fn num_buf_pools(&self) -> usize {
        self.layout.num_buf_pools()
    }

    pub fn num_func_pools(&self) -> usize {
        self.layout.num_func_pools()
    }

    pub fn num_proxy_pools(&self) -> usize {
        self.layout.num_proxy_pools()
    }

    pub fn num_all_pools(&self) -> usize {
        self.layout.num_all_pools()
    }

    pub fn num_rates(&self) -> usize {
        self.layout.num_rates()
    }

    pub fn num_core_rates(&self) -> usize {
        self.layout.num_core_rates()
    }

    pub fn matrix(&self) -> &SparseMatrix<i32> {
        &self.installed.matrix
    }

    pub fn matrix_entry(&self) -> &[i32] {
        self.installed.matrix.matrix_entry()
    }

    pub fn col_index(&self) -> &[usize] {
        self.installed.matrix.col_index()
    }

    pub fn row_start(&self) -> &[usize] {
        self.installed.matrix.row_start()
    }

    pub fn pool_id_map(&self) -> Vec<(ObjectId, usize)> {
        self.layout.pool_id_map()
    }

    pub fn pool_index(&self, pool: ObjectId) -> Option<usize> {
        self.layout.pool_index(pool)
    }

    pub fn rate_index(&self, id: ObjectId) -> Option<usize> {
        self.layout.rate_index(id)
    }

    pub fn rates(&self) -> &[RateTerm] {
        &self.installed.rates
    }

    pub fn funcs(&self) -> &[FuncTerm] {
        &self.installed.funcs
    }

    /// Proxy pools owned by `compartment`; empty for an unknown compartment.
    pub fn proxy_pools(&self, compartment: CompartmentId) -> &[ObjectId] {
        self.classification.proxies.pools(compartment)
    }

    pub fn off_solver_compartments(&self) -> Vec<CompartmentId> {
        self.classification.proxies.compartments()
    }

    pub fn off_core_compartments(&self) -> &[OffCoreCompartments] {
        &self.installed.off_core
    }

    pub fn voxels(&self) -> &[VoxelPools] {
        &self.voxels
    }

    pub fn voxel(&self, index: usize) -> Option<&VoxelPools> {
        self.voxels.get(index)
    }

    /// Objects currently delegated to this system.
    pub fn delegated_objects(&self) -> &[ObjectId] {
        &self.delegated
    }

    fn slot(&self, id: ObjectId) -> Result<usize, StoichError> {
        self.layout
            .rate_index(id)
            .ok_or(StoichError::NotIndexed(id))
    }

    /// Edits the master term at `slot` on behalf of `id` and rescales it in every voxel.
    fn update_rate(
        &mut self,
        id: ObjectId,
        slot: usize,
        f: impl FnOnce(&mut RateTerm),
    ) -> Result<(), StoichError> {
        let term = self
            .installed
            .rates
            .get_mut(slot)
            .ok_or(StoichError::NotIndexed(id))?;
        f(term);
        for voxel in &mut self.voxels {
            voxel.update_rate(slot, &self.installed.rates[slot]);
        }
        Ok(())
    }

    fn rate_at(&self, slot: usize) -> Option<&RateTerm> {
        self.installed.rates.get(slot)
    }

    /// Slot of the reverse half of a reaction, with whether it is a separate term.
    fn reverse_slot(&self, slot: usize) -> (usize, bool) {
        if self.one_way {
            (slot + 1, true)
        } else {
            (slot, false)
        }
    }

    pub fn reac_kf(&self, reac: ObjectId) -> Option<f64> {
        let slot = self.layout.rate_index(reac)?;
        self.rate_at(slot).map(RateTerm::r1)
    }

    pub fn set_reac_kf(&mut self, reac: ObjectId, value: f64) -> Result<(), StoichError> {
        let slot = self.slot(reac)?;
        self.update_rate(reac, slot, |t| t.set_r1(value))
    }

    pub fn reac_kb(&self, reac: ObjectId) -> Option<f64> {
        let (slot, separate) = self.reverse_slot(self.layout.rate_index(reac)?);
        let term = self.rate_at(slot)?;
        Some(if separate { term.r1() } else { term.r2() })
    }

    pub fn set_reac_kb(&mut self, reac: ObjectId, value: f64) -> Result<(), StoichError> {
        let (slot, separate) = self.reverse_slot(self.slot(reac)?);
        self.update_rate(reac, slot, |t| {
            if separate {
                t.set_r1(value)
            } else {
                t.set_r2(value)
            }
        })
    }

    pub fn enz_k1(&self, enz: ObjectId) -> Option<f64> {
        let slot = self.layout.rate_index(enz)?;
        self.rate_at(slot).map(RateTerm::r1)
    }

    pub fn set_enz_k1(&mut self, enz: ObjectId, value: f64) -> Result<(), StoichError> {
        let slot = self.slot(enz)?;
        self.update_rate(enz, slot, |t| t.set_r1(value))
    }

    pub fn enz_k2(&self, enz: ObjectId) -> Option<f64> {
        let (slot, separate) = self.reverse_slot(self.layout.rate_index(enz)?);
        let term = self.rate_at(slot)?;
        Some(if separate { term.r1() } else { term.r2() })
    }

    pub fn set_enz_k2(&mut self, enz: ObjectId, value: f64) -> Result<(), StoichError> {
        let (slot, separate) = self.reverse_slot(self.slot(enz)?);
        self.update_rate(enz, slot, |t| {
            if separate {
                t.set_r1(value)
            } else {
                t.set_r2(value)
            }
        })
    }

    /// Slot of the product-forming step of a full enzyme.
    fn product_slot(&self, slot: usize) -> usize {
        if self.one_way { slot + 2 } else { slot + 1 }
    }

    pub fn enz_k3(&self, enz: ObjectId) -> Option<f64> {
        let slot = self.product_slot(self.layout.rate_index(enz)?);
        self.rate_at(slot).map(RateTerm::r1)
    }

    pub fn set_enz_k3(&mut self, enz: ObjectId, value: f64) -> Result<(), StoichError> {
        let slot = self.product_slot(self.slot(enz)?);
        self.update_rate(enz, slot, |t| t.set_r1(value))
    }

    pub fn mmenz_km(&self, enz: ObjectId) -> Option<f64> {
        let slot = self.layout.rate_index(enz)?;
        self.rate_at(slot).map(RateTerm::r1)
    }

    pub fn set_mmenz_km(&mut self, enz: ObjectId, value: f64) -> Result<(), StoichError> {
        let slot = self.slot(enz)?;
        self.update_rate(enz, slot, |t| t.set_r1(value))
    }

    pub fn mmenz_kcat(&self, enz: ObjectId) -> Option<f64> {
        let slot = self.layout.rate_index(enz)?;
        self.rate_at(slot).map(RateTerm::r2)
    }

    pub fn set_mmenz_kcat(&mut self, enz: ObjectId, value: f64) -> Result<(), StoichError> {
        let slot = self.slot(enz)?;
        self.update_rate(enz, slot, |t| t.set_r2(value))
    }

    fn pool_slot(&self, pool: ObjectId) -> Result<usize, StoichError> {
        self.layout
            .pool_index(pool)
            .ok_or(StoichError::NotIndexed(pool))
    }

    fn voxel_mut(&mut self, voxel: usize) -> Result<&mut VoxelPools, StoichError> {
        let num_voxels = self.voxels.len();
        self.voxels
            .get_mut(voxel)
            .ok_or(StoichError::VoxelOutOfRange { voxel, num_voxels })
    }

    pub fn pool_n(&self, pool: ObjectId, voxel: usize) -> Option<f64> {
        let index = self.layout.pool_index(pool)?;
        self.voxels.get(voxel)?.n().get(index).copied()
    }

    pub fn set_pool_n(&mut self, pool: ObjectId, voxel: usize, value: f64) -> Result<(), StoichError> {
        let index = self.pool_slot(pool)?;
        self.voxel_mut(voxel)?.set_n(index, value);
        Ok(())
    }

    pub fn pool_n_init(&self, pool: ObjectId, voxel: usize) -> Option<f64> {
        let index = self.layout.pool_index(pool)?;
        self.voxels.get(voxel)?.n_init().get(index).copied()
    }

    pub fn set_pool_n_init(
        &mut self,
        pool: ObjectId,
        voxel: usize,
        value: f64,
    ) -> Result<(), StoichError> {
        let index = self.pool_slot(pool)?;
        self.voxel_mut(voxel)?.set_n_init(index, value);
        Ok(())
    }

    /// Sets a pool's initial count in every voxel from a concentration.
    pub fn set_pool_conc_init(&mut self, pool: ObjectId, conc: f64) -> Result<(), StoichError> {
        let index = self.pool_slot(pool)?;
        for voxel in &mut self.voxels {
            let n_init = conc * NA * voxel.pool_volume(index);
            voxel.set_n_init(index, n_init);
        }
        Ok(())
    }

    /// Replaces the expression of an installed function without recompiling.
    ///
    /// Functions driving a rate are looked up by rate slot first, then functions
    /// assigning a pool by func slot. Returns `false`, with a warning, if `func` is
    /// neither.
    pub fn set_function_expr(&mut self, func: ObjectId, expr: &str) -> Result<bool, StoichError> {
        let rate_slot = self
            .layout
            .rate_index(func)
            .or_else(|| self.installed.reac_funcs.get(&func).copied())
            .filter(|&slot| self.rate_at(slot).and_then(RateTerm::func).is_some());

        if let Some(slot) = rate_slot {
            let num_vars = self
                .rate_at(slot)
                .and_then(RateTerm::func)
                .map_or(0, |f| f.args().len());
            let compiled = Expression::compile(expr, num_vars)?;
            let mut result = Ok(());
            self.update_rate(func, slot, |t| result = t.set_func_expr(compiled).map(|_| ()))?;
            result?;
            return Ok(true);
        }

        if let Some(index) = self.layout.func_index(func) {
            if let Some(term) = self.installed.funcs.get_mut(index) {
                let compiled = Expression::compile(expr, term.func().args().len())?;
                term.set_expr(compiled)?;
                return Ok(true);
            }
        }

        warn!(function = ?func, "No installed function term to update.");
        Ok(false)
    }

    /// Evaluates every pool-assigning function into `s`.
    pub fn update_funcs(&self, s: &mut [f64], t: f64) {
        for func in &self.installed.funcs {
            func.eval_pool(s, t);
        }
    }

    /// Rescales one voxel's volume by `ratio`, adjusting counts and rate terms.
    ///
    /// Has no effect unless the last compilation succeeded cleanly.
    pub fn rescale_voxel(&mut self, voxel: usize, ratio: f64) -> Result<(), StoichError> {
        if !self.status.is_ok() {
            return Ok(());
        }
        let rates = &self.installed.rates;
        let num_voxels = self.voxels.len();
        let target = self
            .voxels
            .get_mut(voxel)
            .ok_or(StoichError::VoxelOutOfRange { voxel, num_voxels })?;
        target.scale_volume(ratio, rates);
        Ok(())
    }

    /// Re-reads every kinetic constant from the model objects.
    pub fn update_rates_after_remesh(&mut self, model: &Model) -> Result<(), StoichError> {
        let c = &self.classification;
        let reacs: Vec<ObjectId> = c.reacs.iter().chain(&c.off_solver_reacs).copied().collect();
        let enzs: Vec<ObjectId> = c.enzs.iter().chain(&c.off_solver_enzs).copied().collect();
        let mmenzs: Vec<ObjectId> = c.mmenzs.iter().chain(&c.off_solver_mmenzs).copied().collect();

        for id in reacs {
            if let Some(reac) = model.reac(id) {
                self.set_reac_kf(id, reac.kf)?;
                self.set_reac_kb(id, reac.kb)?;
            }
        }
        for id in enzs {
            if let Some(enz) = model.enz(id) {
                self.set_enz_k1(id, enz.k1)?;
                self.set_enz_k2(id, enz.k2)?;
                self.set_enz_k3(id, enz.k3)?;
            }
        }
        for id in mmenzs {
            if let Some(enz) = model.mmenz(id) {
                self.set_mmenz_km(id, enz.km)?;
                self.set_mmenz_kcat(id, enz.kcat)?;
            }
        }
        Ok(())
    }
}

/// Every classified object except proxies, which stay with their own solver.
fn delegated_objects(c: &Classification) -> Vec<ObjectId> {
    [
        &c.var_pools,
        &c.func_target_pools,
        &c.buf_pools,
        &c.reacs,
        &c.enzs,
        &c.mmenzs,
        &c.off_solver_reacs,
        &c.off_solver_enzs,
        &c.off_solver_mmenzs,
        &c.pool_funcs,
        &c.increment_funcs,
        &c.reac_funcs,
    ]
    .into_iter()
    .flatten()
    .copied()
    .collect()
}
