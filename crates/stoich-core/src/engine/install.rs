use super::allocate::IndexLayout;
use super::classify::Classification;
use super::error::StoichError;
use super::proxy::OffCoreCompartments;
use super::status::Status;
use crate::core::kinetics::NA;
use crate::core::kinetics::expr::Expression;
use crate::core::kinetics::func_term::{BoundExpression, FuncTerm};
use crate::core::kinetics::rate_term::RateTerm;
use crate::core::math::sparse::SparseMatrix;
use crate::core::models::ids::{CompartmentId, ObjectId};
use crate::core::models::model::Model;
use crate::core::models::object::{Function, ObjectKind};
use std::collections::HashMap;
use tracing::warn;

/// The numeric representation produced for one classified reaction system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Installation {
    /// One term per rate slot, in concentration units.
    pub rates: Vec<RateTerm>,
    /// One term per pool-assigning function, in func-slot order.
    pub funcs: Vec<FuncTerm>,
    /// Stoichiometry: pools by rate slots.
    pub matrix: SparseMatrix<i32>,
    pub status: Status,
    /// Owning compartments of each off-core rate slot, from `num_core_rates` on.
    pub off_core: Vec<OffCoreCompartments>,
    /// Rate slot driven by each `set-num-kf` function.
    pub reac_funcs: HashMap<ObjectId, usize>,
}

struct Installer<'a> {
    model: &'a Model,
    layout: &'a IndexLayout,
    out: Installation,
}

/// Builds rate terms, function terms and the stoichiometry matrix.
///
/// With `stochastic` set, mass-action terms are converted to their discrete
/// propensity forms once everything is installed.
pub fn install(
    model: &Model,
    c: &Classification,
    layout: &IndexLayout,
    stochastic: bool,
) -> Result<Installation, StoichError> {
    let mut installer = Installer {
        model,
        layout,
        out: Installation {
            rates: vec![RateTerm::dummy(); layout.num_rates()],
            funcs: Vec::with_capacity(layout.num_funcs()),
            matrix: SparseMatrix::with_size(layout.num_all_pools(), layout.num_rates()),
            status: Status::OK,
            off_core: vec![
                OffCoreCompartments::default();
                layout.num_rates() - layout.num_core_rates()
            ],
            reac_funcs: HashMap::new(),
        },
    };

    for &id in c.reacs.iter().chain(&c.off_solver_reacs) {
        installer.install_reac(id)?;
    }
    for &id in c.enzs.iter().chain(&c.off_solver_enzs) {
        installer.install_enz(id)?;
    }
    for &id in c.mmenzs.iter().chain(&c.off_solver_mmenzs) {
        installer.install_mmenz(id)?;
    }
    for &id in &c.increment_funcs {
        installer.install_increment_func(id)?;
    }
    for &id in &c.pool_funcs {
        installer.install_pool_func(id)?;
    }
    for &id in &c.reac_funcs {
        installer.install_reac_func(id)?;
    }

    let mut out = installer.out;
    if stochastic {
        out.rates = out
            .rates
            .into_iter()
            .map(RateTerm::into_stochastic)
            .collect();
    }
    Ok(out)
}

impl<'a> Installer<'a> {
    fn path(&self, id: ObjectId) -> String {
        self.model.path_of(id).unwrap_or_default()
    }

    fn rate_slot(&self, id: ObjectId) -> Result<usize, StoichError> {
        self.layout
            .rate_index(id)
            .ok_or_else(|| StoichError::NotInstalled { path: self.path(id) })
    }

    fn resolve(&self, owner: ObjectId, pools: &[ObjectId]) -> Result<Vec<usize>, StoichError> {
        pools
            .iter()
            .map(|&pool| {
                self.layout
                    .pool_index(pool)
                    .ok_or_else(|| StoichError::UnresolvedPool {
                        path: self.path(owner),
                        pool,
                    })
            })
            .collect()
    }

    fn compartments(&self, pools: &[ObjectId]) -> Vec<CompartmentId> {
        pools
            .iter()
            .filter_map(|&p| self.model.compartment_of(p))
            .collect()
    }

    fn add(&mut self, pool: usize, slot: usize, delta: i32) {
        let value = self.out.matrix.get(pool, slot) + delta;
        self.out.matrix.set(pool, slot, value);
    }

    fn record_off_core(&mut self, slot: usize, record: OffCoreCompartments) {
        if let Some(entry) = slot
            .checked_sub(self.layout.num_core_rates())
            .and_then(|i| self.out.off_core.get_mut(i))
        {
            *entry = record;
        }
    }

    fn half_reaction(&mut self, owner: ObjectId, k: f64, reactants: &[usize]) -> RateTerm {
        if reactants.is_empty() {
            warn!(reaction = %self.path(owner), "Half-reaction has no reactants; installing a dummy term.");
            self.out.status.insert(Status::MISSING_REACTANT);
            return RateTerm::dummy();
        }
        RateTerm::mass_action(k, reactants)
    }

    fn install_reac(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let model = self.model;
        let reac = model.reac(id).ok_or(StoichError::ObjectNotFound(id))?;
        let slot = self.rate_slot(id)?;
        let subs = self.resolve(id, &reac.substrates)?;
        let prds = self.resolve(id, &reac.products)?;

        let forward = self.half_reaction(id, reac.kf, &subs);
        let backward = self.half_reaction(id, reac.kb, &prds);

        if self.layout.one_way() {
            self.out.rates[slot] = forward;
            self.out.rates[slot + 1] = backward;
            for &s in &subs {
                self.add(s, slot, -1);
                self.add(s, slot + 1, 1);
            }
            for &p in &prds {
                self.add(p, slot, 1);
                self.add(p, slot + 1, -1);
            }
            let sub_compts = self.compartments(&reac.substrates);
            let prd_compts = self.compartments(&reac.products);
            self.record_off_core(
                slot,
                OffCoreCompartments {
                    substrates: sub_compts,
                    products: Vec::new(),
                },
            );
            self.record_off_core(
                slot + 1,
                OffCoreCompartments {
                    substrates: prd_compts,
                    products: Vec::new(),
                },
            );
        } else {
            self.out.rates[slot] = RateTerm::bidirectional(forward, backward);
            for &s in &subs {
                self.add(s, slot, -1);
            }
            for &p in &prds {
                self.add(p, slot, 1);
            }
            let record = OffCoreCompartments {
                substrates: self.compartments(&reac.substrates),
                products: self.compartments(&reac.products),
            };
            self.record_off_core(slot, record);
        }
        Ok(())
    }

    fn install_dummy_enz(&mut self, id: ObjectId, slot: usize, reason: &str) {
        warn!(enzyme = %self.path(id), reason, "Installing a dummy enzyme.");
        if self.layout.one_way() {
            self.out.rates[slot..slot + 3].fill(RateTerm::dummy());
        } else {
            self.out.rates[slot] = RateTerm::bidirectional(RateTerm::dummy(), RateTerm::dummy());
            self.out.rates[slot + 1] = RateTerm::dummy();
        }
        self.out.status.insert(Status::MISSING_REACTANT);
    }

    fn install_enz(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let model = self.model;
        let enz = model.enz(id).ok_or(StoichError::ObjectNotFound(id))?;
        let slot = self.rate_slot(id)?;

        let (enz_pool, cplx) = match (enz.enzymes.as_slice(), enz.complex) {
            ([_], Some(_)) if enz.substrates.is_empty() => {
                self.install_dummy_enz(id, slot, "no substrates");
                return Ok(());
            }
            ([_], Some(_)) if enz.products.is_empty() => {
                self.install_dummy_enz(id, slot, "no products");
                return Ok(());
            }
            ([e], Some(c)) => (*e, c),
            ([_], None) => {
                self.install_dummy_enz(id, slot, "no enzyme-substrate complex");
                return Ok(());
            }
            _ => {
                self.install_dummy_enz(id, slot, "needs exactly one enzyme pool");
                return Ok(());
            }
        };

        let e = self.resolve(id, &[enz_pool])?[0];
        let c = self.resolve(id, &[cplx])?[0];
        let subs = self.resolve(id, &enz.substrates)?;
        let prds = self.resolve(id, &enz.products)?;

        let mut forward_reactants = vec![e];
        forward_reactants.extend_from_slice(&subs);
        let r1 = RateTerm::mass_action(enz.k1, &forward_reactants);
        let r2 = RateTerm::mass_action(enz.k2, &[c]);
        let r3 = RateTerm::mass_action(enz.k3, &[c]);

        let product_slot = if self.layout.one_way() {
            self.out.rates[slot] = r1;
            self.out.rates[slot + 1] = r2;
            for &r in &forward_reactants {
                self.add(r, slot, -1);
                self.add(r, slot + 1, 1);
            }
            self.add(c, slot, 1);
            self.add(c, slot + 1, -1);
            slot + 2
        } else {
            self.out.rates[slot] = RateTerm::bidirectional(r1, r2);
            for &r in &forward_reactants {
                self.add(r, slot, -1);
            }
            self.add(c, slot, 1);
            slot + 1
        };

        self.out.rates[product_slot] = r3;
        self.add(c, product_slot, -1);
        for &p in &prds {
            self.add(p, product_slot, 1);
        }
        self.add(e, product_slot, 1);

        let record = OffCoreCompartments {
            substrates: self.compartments(&enz.substrates),
            products: Vec::new(),
        };
        self.record_off_core(slot, record);
        Ok(())
    }

    fn install_mmenz(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let model = self.model;
        let mm = model.mmenz(id).ok_or(StoichError::ObjectNotFound(id))?;
        let slot = self.rate_slot(id)?;

        let degenerate = match (mm.enzymes.len(), mm.substrates.is_empty(), mm.products.is_empty()) {
            (n, _, _) if n != 1 => Some(("needs exactly one enzyme pool", Status::MISSING_MM_SUBSTRATE)),
            (_, _, true) => Some(("no products", Status::MISSING_REACTANT)),
            (_, true, _) => Some(("no substrates", Status::MISSING_MM_SUBSTRATE)),
            _ => None,
        };
        if let Some((reason, flag)) = degenerate {
            warn!(enzyme = %self.path(id), reason, "Installing a dummy Michaelis-Menten enzyme.");
            self.out.rates[slot] = RateTerm::dummy();
            self.out.status.insert(flag);
            return Ok(());
        }

        let e = self.resolve(id, &mm.enzymes)?[0];
        let subs = self.resolve(id, &mm.substrates)?;
        let prds = self.resolve(id, &mm.products)?;

        self.out.rates[slot] = RateTerm::michaelis_menten(mm.km, mm.kcat, e, &subs);
        for &s in &subs {
            self.add(s, slot, -1);
        }
        for &p in &prds {
            self.add(p, slot, 1);
        }

        let record = OffCoreCompartments {
            substrates: self.compartments(&mm.substrates),
            products: Vec::new(),
        };
        self.record_off_core(slot, record);
        Ok(())
    }

    fn function(&self, id: ObjectId) -> Result<&'a Function, StoichError> {
        let model: &'a Model = self.model;
        match model.object(id).map(|o| &o.kind) {
            Some(ObjectKind::Function(f)) => Ok(f),
            _ => Err(StoichError::ObjectNotFound(id)),
        }
    }

    /// Compiles a function's expression and binds its inputs to pool indices.
    fn bind(&self, id: ObjectId, func: &Function) -> Result<BoundExpression, StoichError> {
        if func.num_vars != func.inputs.len() {
            return Err(StoichError::ArgumentMismatch {
                path: self.path(id),
                expected: func.num_vars,
                found: func.inputs.len(),
            });
        }
        let args = self.resolve(id, &func.inputs)?;
        let expr = Expression::compile(&func.expr, func.num_vars)?;
        Ok(BoundExpression::new(expr, args)?)
    }

    fn target(&self, id: ObjectId, func: &Function) -> Result<ObjectId, StoichError> {
        func.outputs
            .first()
            .map(|o| o.target)
            .ok_or_else(|| StoichError::FunctionTarget {
                path: self.path(id),
                found: 0,
            })
    }

    fn install_increment_func(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let func = self.function(id)?;
        let slot = self.rate_slot(id)?;
        let target = self.resolve(id, &[self.target(id, func)?])?[0];
        let bound = self.bind(id, func)?;

        self.out.rates[slot] = RateTerm::FuncRate {
            k: 1.0,
            func: bound,
        };
        self.add(target, slot, 1);
        Ok(())
    }

    fn install_pool_func(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let func = self.function(id)?;
        let output = func.outputs.first().copied().ok_or_else(|| StoichError::FunctionTarget {
            path: self.path(id),
            found: 0,
        })?;
        let target = self.resolve(id, &[output.target])?[0];
        let bound = self.bind(id, func)?;

        let vol_scale = if output.method.is_concentration() {
            NA * self.model.object_volume(output.target, 0).unwrap_or_default()
        } else {
            1.0
        };
        self.out.funcs.push(FuncTerm::new(bound, target, vol_scale));
        Ok(())
    }

    fn install_reac_func(&mut self, id: ObjectId) -> Result<(), StoichError> {
        let model = self.model;
        let func = self.function(id)?;
        let reac = self.target(id, func)?;
        let slot = match (model.reac(reac), self.layout.rate_index(reac)) {
            (Some(_), Some(slot)) => slot,
            _ => {
                warn!(
                    function = %self.path(id),
                    target = %self.path(reac),
                    "Rate-constant function targets a reaction outside the system; skipping."
                );
                return Ok(());
            }
        };
        let bound = self.bind(id, func)?;

        let forward = match &mut self.out.rates[slot] {
            RateTerm::Bidirectional { forward, .. } => forward.as_mut(),
            term => term,
        };
        *forward = RateTerm::FuncReac {
            k: forward.r1(),
            v: forward.reactants(),
            func: bound,
        };
        self.out.reac_funcs.insert(id, slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::CompartmentId;
    use crate::core::models::object::{Enz, FunctionOutput, MMEnz, TargetMethod};
    use crate::engine::allocate::allocate;
    use crate::engine::classify::classify;

    const VOL: f64 = 1e-18;

    struct TestRefs {
        cyt: CompartmentId,
        a: ObjectId,
        b: ObjectId,
        e: ObjectId,
    }

    fn create_base_model() -> (Model, TestRefs) {
        let mut model = Model::new();
        let cyt = model.add_compartment("cyt", vec![VOL]);
        let a = model.add_pool(cyt, "A", 1.0).unwrap();
        let b = model.add_pool(cyt, "B", 0.0).unwrap();
        let e = model.add_pool(cyt, "E", 0.1).unwrap();
        (model, TestRefs { cyt, a, b, e })
    }

    fn compile(model: &Model, refs: &TestRefs, one_way: bool) -> (IndexLayout, Installation) {
        let elist = model.wildcard_find("/cyt/##");
        let c = classify(model, refs.cyt, &elist).unwrap();
        let layout = allocate(&c, one_way);
        let installed = install(model, &c, &layout, false).unwrap();
        (layout, installed)
    }

    fn entry(layout: &IndexLayout, inst: &Installation, pool: ObjectId, slot: usize) -> i32 {
        inst.matrix.get(layout.pool_index(pool).unwrap(), slot)
    }

    mod reactions {
        use super::*;

        #[test]
        fn one_way_reaction_uses_two_mirrored_slots() {
            let (mut model, refs) = create_base_model();
            model
                .add_reac(refs.cyt, "r", 2.0, 0.5, vec![refs.a], vec![refs.b])
                .unwrap();
            let (layout, inst) = compile(&model, &refs, true);

            assert_eq!(inst.rates.len(), 2);
            assert_eq!(entry(&layout, &inst, refs.a, 0), -1);
            assert_eq!(entry(&layout, &inst, refs.b, 0), 1);
            assert_eq!(entry(&layout, &inst, refs.a, 1), 1);
            assert_eq!(entry(&layout, &inst, refs.b, 1), -1);
            assert_eq!(inst.rates[0].r1(), 2.0);
            assert_eq!(inst.rates[1].r1(), 0.5);
            assert!(inst.status.is_ok());
        }

        #[test]
        fn combined_reaction_is_one_bidirectional_slot() {
            let (mut model, refs) = create_base_model();
            model
                .add_reac(refs.cyt, "r", 2.0, 0.5, vec![refs.a], vec![refs.b])
                .unwrap();
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.rates.len(), 1);
            assert!(matches!(inst.rates[0], RateTerm::Bidirectional { .. }));
            assert_eq!((inst.rates[0].r1(), inst.rates[0].r2()), (2.0, 0.5));
            assert_eq!(entry(&layout, &inst, refs.a, 0), -1);
            assert_eq!(entry(&layout, &inst, refs.b, 0), 1);
            assert_eq!(inst.matrix.nnz(), 2);
        }

        #[test]
        fn repeated_substrate_accumulates_coefficient() {
            let (mut model, refs) = create_base_model();
            model
                .add_reac(refs.cyt, "dimer", 1.0, 0.0, vec![refs.a, refs.a], vec![refs.b])
                .unwrap();
            let (layout, inst) = compile(&model, &refs, false);
            assert_eq!(entry(&layout, &inst, refs.a, 0), -2);
        }

        #[test]
        fn reaction_without_products_sets_missing_reactant() {
            let (mut model, refs) = create_base_model();
            model
                .add_reac(refs.cyt, "sink", 1.0, 1.0, vec![refs.a], vec![])
                .unwrap();
            let (_, inst) = compile(&model, &refs, true);
            assert!(inst.status.contains(Status::MISSING_REACTANT));
            assert!(inst.rates[1].is_dummy());
        }

        #[test]
        fn unresolved_pool_is_fatal() {
            let (mut model, refs) = create_base_model();
            let r = model
                .add_reac(refs.cyt, "r", 1.0, 0.0, vec![refs.a], vec![refs.b])
                .unwrap();
            let c = classify(&model, refs.cyt, &[r, refs.a]).unwrap();
            let layout = allocate(&c, false);
            assert!(matches!(
                install(&model, &c, &layout, false),
                Err(StoichError::UnresolvedPool { pool, .. }) if pool == refs.b
            ));
        }
    }

    mod enzymes {
        use super::*;

        #[test]
        fn full_enzyme_one_way_stoichiometry() {
            let (mut model, refs) = create_base_model();
            let cplx = model.add_pool(refs.cyt, "C", 0.0).unwrap();
            model
                .add_enz(
                    refs.cyt,
                    "enz",
                    Enz {
                        k1: 1.0,
                        k2: 2.0,
                        k3: 3.0,
                        enzymes: vec![refs.e],
                        complex: Some(cplx),
                        substrates: vec![refs.a],
                        products: vec![refs.b],
                    },
                )
                .unwrap();
            let (layout, inst) = compile(&model, &refs, true);

            assert_eq!(inst.rates.len(), 3);
            // E + A -> C
            assert_eq!(entry(&layout, &inst, refs.e, 0), -1);
            assert_eq!(entry(&layout, &inst, refs.a, 0), -1);
            assert_eq!(entry(&layout, &inst, cplx, 0), 1);
            // C -> E + A
            assert_eq!(entry(&layout, &inst, refs.e, 1), 1);
            assert_eq!(entry(&layout, &inst, cplx, 1), -1);
            // C -> E + B
            assert_eq!(entry(&layout, &inst, cplx, 2), -1);
            assert_eq!(entry(&layout, &inst, refs.b, 2), 1);
            assert_eq!(entry(&layout, &inst, refs.e, 2), 1);
            assert_eq!(
                (inst.rates[0].r1(), inst.rates[1].r1(), inst.rates[2].r1()),
                (1.0, 2.0, 3.0)
            );
        }

        #[test]
        fn full_enzyme_combined_uses_two_slots() {
            let (mut model, refs) = create_base_model();
            let cplx = model.add_pool(refs.cyt, "C", 0.0).unwrap();
            model
                .add_enz(
                    refs.cyt,
                    "enz",
                    Enz {
                        k1: 1.0,
                        k2: 2.0,
                        k3: 3.0,
                        enzymes: vec![refs.e],
                        complex: Some(cplx),
                        substrates: vec![refs.a],
                        products: vec![refs.b],
                    },
                )
                .unwrap();
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.rates.len(), 2);
            assert_eq!((inst.rates[0].r1(), inst.rates[0].r2()), (1.0, 2.0));
            assert_eq!(inst.rates[1].r1(), 3.0);
            assert_eq!(entry(&layout, &inst, cplx, 0), 1);
            assert_eq!(entry(&layout, &inst, refs.e, 1), 1);
        }

        #[test]
        fn enzyme_without_complex_is_a_dummy() {
            let (mut model, refs) = create_base_model();
            model
                .add_enz(
                    refs.cyt,
                    "enz",
                    Enz {
                        k1: 1.0,
                        k2: 2.0,
                        k3: 3.0,
                        enzymes: vec![refs.e],
                        complex: None,
                        substrates: vec![refs.a],
                        products: vec![refs.b],
                    },
                )
                .unwrap();
            let (_, inst) = compile(&model, &refs, true);
            assert!(inst.rates.iter().all(RateTerm::is_dummy));
            assert_eq!(inst.matrix.nnz(), 0);
            assert!(inst.status.contains(Status::MISSING_REACTANT));
        }

        fn add_enz_with(
            model: &mut Model,
            refs: &TestRefs,
            substrates: Vec<ObjectId>,
            products: Vec<ObjectId>,
        ) {
            let cplx = model.add_pool(refs.cyt, "C", 0.0).unwrap();
            model
                .add_enz(
                    refs.cyt,
                    "enz",
                    Enz {
                        k1: 1.0,
                        k2: 2.0,
                        k3: 3.0,
                        enzymes: vec![refs.e],
                        complex: Some(cplx),
                        substrates,
                        products,
                    },
                )
                .unwrap();
        }

        #[test]
        fn enzyme_without_products_is_a_dummy() {
            let (mut model, refs) = create_base_model();
            add_enz_with(&mut model, &refs, vec![refs.a], Vec::new());

            for one_way in [true, false] {
                let (_, inst) = compile(&model, &refs, one_way);
                assert!(inst.rates.iter().all(RateTerm::is_dummy));
                assert_eq!(inst.matrix.nnz(), 0);
                assert!(inst.status.contains(Status::MISSING_REACTANT));
            }
        }

        #[test]
        fn enzyme_without_substrates_is_a_dummy() {
            let (mut model, refs) = create_base_model();
            add_enz_with(&mut model, &refs, Vec::new(), vec![refs.b]);

            for one_way in [true, false] {
                let (_, inst) = compile(&model, &refs, one_way);
                assert!(inst.rates.iter().all(RateTerm::is_dummy));
                assert_eq!(inst.matrix.nnz(), 0);
                assert!(inst.status.contains(Status::MISSING_REACTANT));
            }
        }

        #[test]
        fn mm_enzyme_leaves_enzyme_out_of_the_matrix() {
            let (mut model, refs) = create_base_model();
            model
                .add_mmenz(
                    refs.cyt,
                    "mm",
                    MMEnz {
                        km: 0.5,
                        kcat: 4.0,
                        enzymes: vec![refs.e],
                        substrates: vec![refs.a],
                        products: vec![refs.b],
                    },
                )
                .unwrap();
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.rates.len(), 1);
            assert_eq!(entry(&layout, &inst, refs.a, 0), -1);
            assert_eq!(entry(&layout, &inst, refs.b, 0), 1);
            assert_eq!(entry(&layout, &inst, refs.e, 0), 0);
            assert_eq!((inst.rates[0].r1(), inst.rates[0].r2()), (0.5, 4.0));
        }

        #[test]
        fn mm_enzyme_without_substrate_sets_bit_two() {
            let (mut model, refs) = create_base_model();
            model
                .add_mmenz(
                    refs.cyt,
                    "mm",
                    MMEnz {
                        km: 0.5,
                        kcat: 4.0,
                        enzymes: vec![refs.e],
                        substrates: vec![],
                        products: vec![refs.b],
                    },
                )
                .unwrap();
            let (_, inst) = compile(&model, &refs, false);
            assert!(inst.rates[0].is_dummy());
            assert_eq!(inst.status, Status::MISSING_MM_SUBSTRATE);
        }
    }

    mod functions {
        use super::*;

        fn add_function(
            model: &mut Model,
            refs: &TestRefs,
            name: &str,
            expr: &str,
            inputs: Vec<ObjectId>,
            output: FunctionOutput,
        ) -> ObjectId {
            let mut func = Function::new(expr, inputs.len());
            func.inputs = inputs;
            func.outputs = vec![output];
            model.add_function(refs.cyt, name, func).unwrap()
        }

        #[test]
        fn increment_function_adds_a_func_rate() {
            let (mut model, refs) = create_base_model();
            add_function(
                &mut model,
                &refs,
                "inc",
                "x0 * 2.0",
                vec![refs.a],
                FunctionOutput {
                    target: refs.b,
                    method: TargetMethod::Increment,
                },
            );
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.rates.len(), 1);
            assert!(matches!(inst.rates[0], RateTerm::FuncRate { k, .. } if k == 1.0));
            assert_eq!(entry(&layout, &inst, refs.b, 0), 1);

            let mut s = vec![0.0; layout.num_all_pools()];
            s[layout.pool_index(refs.a).unwrap()] = 3.0;
            assert_eq!(inst.rates[0].rate(&s, 0.0), 6.0);
        }

        #[test]
        fn concentration_target_scales_by_volume() {
            let (mut model, refs) = create_base_model();
            add_function(
                &mut model,
                &refs,
                "conc",
                "x0",
                vec![refs.a],
                FunctionOutput {
                    target: refs.b,
                    method: TargetMethod::SetConc,
                },
            );
            add_function(
                &mut model,
                &refs,
                "count",
                "x0",
                vec![refs.a],
                FunctionOutput {
                    target: refs.e,
                    method: TargetMethod::SetN,
                },
            );
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.funcs.len(), 2);
            assert_eq!(layout.num_func_pools(), 2);
            let scales: Vec<f64> = inst.funcs.iter().map(FuncTerm::vol_scale).collect();
            assert!(scales.contains(&1.0));
            assert!(scales.contains(&(NA * VOL)));
        }

        #[test]
        fn argument_mismatch_is_fatal() {
            let (mut model, refs) = create_base_model();
            let mut func = Function::new("x0 + x1", 2);
            func.inputs = vec![refs.a];
            func.outputs = vec![FunctionOutput {
                target: refs.b,
                method: TargetMethod::SetN,
            }];
            model.add_function(refs.cyt, "f", func).unwrap();

            let elist = model.wildcard_find("/cyt/##");
            let c = classify(&model, refs.cyt, &elist).unwrap();
            let layout = allocate(&c, false);
            assert!(matches!(
                install(&model, &c, &layout, false),
                Err(StoichError::ArgumentMismatch {
                    expected: 2,
                    found: 1,
                    ..
                })
            ));
        }

        #[test]
        fn set_num_kf_replaces_forward_term() {
            let (mut model, refs) = create_base_model();
            let r = model
                .add_reac(refs.cyt, "r", 2.0, 0.5, vec![refs.a], vec![refs.b])
                .unwrap();
            let f = add_function(
                &mut model,
                &refs,
                "kf",
                "x0",
                vec![refs.e],
                FunctionOutput {
                    target: r,
                    method: TargetMethod::SetNumKf,
                },
            );
            let (layout, inst) = compile(&model, &refs, false);

            assert_eq!(inst.reac_funcs.get(&f), Some(&0));
            let RateTerm::Bidirectional { forward, backward } = &inst.rates[0] else {
                panic!("expected a bidirectional term");
            };
            assert!(matches!(**forward, RateTerm::FuncReac { .. }));
            assert_eq!(backward.r1(), 0.5);

            let mut s = vec![0.0; layout.num_all_pools()];
            s[layout.pool_index(refs.a).unwrap()] = 3.0;
            s[layout.pool_index(refs.e).unwrap()] = 4.0;
            assert_eq!(inst.rates[0].rate(&s, 0.0), 12.0);
        }
    }

    #[test]
    fn stochastic_install_converts_dimerisation() {
        let (mut model, refs) = create_base_model();
        model
            .add_reac(refs.cyt, "dimer", 1.0, 0.0, vec![refs.a, refs.a], vec![refs.b])
            .unwrap();
        let elist = model.wildcard_find("/cyt/##");
        let c = classify(&model, refs.cyt, &elist).unwrap();
        let layout = allocate(&c, true);
        let inst = install(&model, &c, &layout, true).unwrap();
        assert!(matches!(
            inst.rates[0],
            RateTerm::StochSecondOrderSingleSubstrate { .. }
        ));
    }
}
