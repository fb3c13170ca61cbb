use super::NA;
use super::expr::{ExprError, Expression};
use super::func_term::BoundExpression;

/// A rate evaluator over a species vector.
///
/// Each variant holds the pool indices it reads and its kinetic constants. Master
/// terms held by a compiled system are in concentration units; voxel copies made by
/// [`RateTerm::with_volume_scaling`] are in molecule-number units.
#[derive(Debug, Clone, PartialEq)]
pub enum RateTerm {
    ZeroOrder {
        k: f64,
    },
    FirstOrder {
        k: f64,
        y: usize,
    },
    SecondOrder {
        k: f64,
        y1: usize,
        y2: usize,
    },
    NOrder {
        k: f64,
        v: Vec<usize>,
    },
    /// Michaelis-Menten with a single substrate.
    MMEnzyme1 {
        km: f64,
        kcat: f64,
        enz: usize,
        sub: usize,
    },
    /// Michaelis-Menten where the substrate term is the product of several pools.
    MMEnzyme {
        km: f64,
        kcat: f64,
        enz: usize,
        substrates: Vec<usize>,
    },
    /// A reversible reaction evaluated as `forward - backward`.
    Bidirectional {
        forward: Box<RateTerm>,
        backward: Box<RateTerm>,
    },
    /// `k * x * (x - 1)`, the propensity of two molecules of one species meeting.
    StochSecondOrderSingleSubstrate {
        k: f64,
        y: usize,
    },
    /// Higher-order propensity using a falling factorial for each repeated species.
    StochNOrder {
        k: f64,
        v: Vec<usize>,
    },
    /// A rate given directly by a function of pool values.
    FuncRate {
        k: f64,
        func: BoundExpression,
    },
    /// A mass-action forward rate whose rate constant is a function of pool values.
    FuncReac {
        k: f64,
        v: Vec<usize>,
        func: BoundExpression,
    },
}

impl RateTerm {
    /// A zero-rate placeholder for degenerate reactions.
    pub fn dummy() -> Self {
        RateTerm::ZeroOrder { k: 0.0 }
    }

    /// Builds a mass-action term whose order follows the number of reactants.
    ///
    /// Returns a zero-order term with rate `k` when `reactants` is empty; callers
    /// treating that as degenerate replace it with [`RateTerm::dummy`].
    pub fn mass_action(k: f64, reactants: &[usize]) -> Self {
        match reactants {
            [] => RateTerm::ZeroOrder { k },
            [y] => RateTerm::FirstOrder { k, y: *y },
            [y1, y2] => RateTerm::SecondOrder {
                k,
                y1: *y1,
                y2: *y2,
            },
            v => RateTerm::NOrder { k, v: v.to_vec() },
        }
    }

    /// Builds a Michaelis-Menten term for an enzyme acting on `substrates`.
    pub fn michaelis_menten(km: f64, kcat: f64, enz: usize, substrates: &[usize]) -> Self {
        match substrates {
            [sub] => RateTerm::MMEnzyme1 {
                km,
                kcat,
                enz,
                sub: *sub,
            },
            subs => RateTerm::MMEnzyme {
                km,
                kcat,
                enz,
                substrates: subs.to_vec(),
            },
        }
    }

    pub fn bidirectional(forward: RateTerm, backward: RateTerm) -> Self {
        RateTerm::Bidirectional {
            forward: Box::new(forward),
            backward: Box::new(backward),
        }
    }

    /// Evaluates the rate at species values `s` and time `t`.
    pub fn rate(&self, s: &[f64], t: f64) -> f64 {
        let at = |i: usize| s.get(i).copied().unwrap_or(0.0);
        match self {
            RateTerm::ZeroOrder { k } => *k,
            RateTerm::FirstOrder { k, y } => k * at(*y),
            RateTerm::SecondOrder { k, y1, y2 } => k * at(*y1) * at(*y2),
            RateTerm::NOrder { k, v } => v.iter().fold(*k, |acc, &i| acc * at(i)),
            RateTerm::MMEnzyme1 { km, kcat, enz, sub } => {
                let sub = at(*sub);
                kcat * sub * at(*enz) / (km + sub)
            }
            RateTerm::MMEnzyme {
                km,
                kcat,
                enz,
                substrates,
            } => {
                let sub: f64 = substrates.iter().map(|&i| at(i)).product();
                kcat * sub * at(*enz) / (km + sub)
            }
            RateTerm::Bidirectional { forward, backward } => {
                forward.rate(s, t) - backward.rate(s, t)
            }
            RateTerm::StochSecondOrderSingleSubstrate { k, y } => {
                let x = at(*y);
                k * x * (x - 1.0)
            }
            RateTerm::StochNOrder { k, v } => stoch_propensity(*k, v, s),
            RateTerm::FuncRate { k, func } => k * func.eval(s, t),
            RateTerm::FuncReac { v, func, .. } => {
                v.iter().fold(func.eval(s, t), |acc, &i| acc * at(i))
            }
        }
    }

    /// The primary rate constant: `kf` for mass action, `Km` for Michaelis-Menten.
    pub fn r1(&self) -> f64 {
        match self {
            RateTerm::ZeroOrder { k }
            | RateTerm::FirstOrder { k, .. }
            | RateTerm::SecondOrder { k, .. }
            | RateTerm::NOrder { k, .. }
            | RateTerm::StochSecondOrderSingleSubstrate { k, .. }
            | RateTerm::StochNOrder { k, .. }
            | RateTerm::FuncRate { k, .. }
            | RateTerm::FuncReac { k, .. } => *k,
            RateTerm::MMEnzyme1 { km, .. } | RateTerm::MMEnzyme { km, .. } => *km,
            RateTerm::Bidirectional { forward, .. } => forward.r1(),
        }
    }

    /// The secondary rate constant: `kb` for reversible terms, `kcat` for
    /// Michaelis-Menten, zero otherwise.
    pub fn r2(&self) -> f64 {
        match self {
            RateTerm::MMEnzyme1 { kcat, .. } | RateTerm::MMEnzyme { kcat, .. } => *kcat,
            RateTerm::Bidirectional { backward, .. } => backward.r1(),
            _ => 0.0,
        }
    }

    pub fn set_r1(&mut self, value: f64) {
        match self {
            RateTerm::ZeroOrder { k }
            | RateTerm::FirstOrder { k, .. }
            | RateTerm::SecondOrder { k, .. }
            | RateTerm::NOrder { k, .. }
            | RateTerm::StochSecondOrderSingleSubstrate { k, .. }
            | RateTerm::StochNOrder { k, .. }
            | RateTerm::FuncRate { k, .. }
            | RateTerm::FuncReac { k, .. } => *k = value,
            RateTerm::MMEnzyme1 { km, .. } | RateTerm::MMEnzyme { km, .. } => *km = value,
            RateTerm::Bidirectional { forward, .. } => forward.set_r1(value),
        }
    }

    /// Sets the secondary rate constant; a no-op on terms that have none.
    pub fn set_r2(&mut self, value: f64) {
        match self {
            RateTerm::MMEnzyme1 { kcat, .. } | RateTerm::MMEnzyme { kcat, .. } => {
                *kcat = value
            }
            RateTerm::Bidirectional { backward, .. } => backward.set_r1(value),
            _ => {}
        }
    }

    /// Pool indices consumed in the forward direction, with repeats.
    ///
    /// Michaelis-Menten terms report the enzyme first, then the substrates.
    pub fn reactants(&self) -> Vec<usize> {
        match self {
            RateTerm::ZeroOrder { .. } | RateTerm::FuncRate { .. } => Vec::new(),
            RateTerm::FirstOrder { y, .. } => vec![*y],
            RateTerm::SecondOrder { y1, y2, .. } => vec![*y1, *y2],
            RateTerm::StochSecondOrderSingleSubstrate { y, .. } => vec![*y, *y],
            RateTerm::NOrder { v, .. }
            | RateTerm::StochNOrder { v, .. }
            | RateTerm::FuncReac { v, .. } => v.clone(),
            RateTerm::MMEnzyme1 { enz, sub, .. } => vec![*enz, *sub],
            RateTerm::MMEnzyme {
                enz, substrates, ..
            } => std::iter::once(*enz)
                .chain(substrates.iter().copied())
                .collect(),
            RateTerm::Bidirectional { forward, .. } => forward.reactants(),
        }
    }

    /// Pool indices consumed in the reverse direction; empty for one-way terms.
    pub fn reverse_reactants(&self) -> Vec<usize> {
        match self {
            RateTerm::Bidirectional { backward, .. } => backward.reactants(),
            _ => Vec::new(),
        }
    }

    /// Mass-action order, or `None` for terms not scaled as plain mass action.
    pub fn order(&self) -> Option<usize> {
        match self {
            RateTerm::ZeroOrder { .. } => Some(0),
            RateTerm::FirstOrder { .. } => Some(1),
            RateTerm::SecondOrder { .. } | RateTerm::StochSecondOrderSingleSubstrate { .. } => {
                Some(2)
            }
            RateTerm::NOrder { v, .. } | RateTerm::StochNOrder { v, .. } => Some(v.len()),
            _ => None,
        }
    }

    pub fn is_dummy(&self) -> bool {
        match self {
            RateTerm::ZeroOrder { k } => *k == 0.0,
            RateTerm::Bidirectional { forward, backward } => forward.is_dummy() && backward.is_dummy(),
            _ => false,
        }
    }

    /// Replaces the expression of a function-driven term.
    ///
    /// Returns `Ok(false)` if the term is not function-driven.
    pub fn set_func_expr(&mut self, expr: Expression) -> Result<bool, ExprError> {
        match self {
            RateTerm::FuncRate { func, .. } | RateTerm::FuncReac { func, .. } => {
                func.set_expr(expr)?;
                Ok(true)
            }
            RateTerm::Bidirectional { forward, .. } => forward.set_func_expr(expr),
            _ => Ok(false),
        }
    }

    /// The bound expression of a function-driven term, looking through the forward
    /// half of a reversible term.
    pub fn func(&self) -> Option<&BoundExpression> {
        match self {
            RateTerm::FuncRate { func, .. } | RateTerm::FuncReac { func, .. } => Some(func),
            RateTerm::Bidirectional { forward, .. } => forward.func(),
            _ => None,
        }
    }

    /// The stochastic form of this term, used when a discrete-molecule solver drives
    /// the system.
    pub fn into_stochastic(self) -> RateTerm {
        match self {
            RateTerm::SecondOrder { k, y1, y2 } if y1 == y2 => {
                RateTerm::StochSecondOrderSingleSubstrate { k, y: y1 }
            }
            RateTerm::NOrder { k, v } => RateTerm::StochNOrder { k, v },
            RateTerm::Bidirectional { forward, backward } => RateTerm::Bidirectional {
                forward: Box::new((*forward).into_stochastic()),
                backward: Box::new((*backward).into_stochastic()),
            },
            other => other,
        }
    }

    /// Copies the term into molecule-number units.
    ///
    /// `pool_volume(i)` gives the volume of the compartment owning pool `i`. A
    /// mass-action constant becomes `k * NA * V_ref / prod(NA * V_i)` over its
    /// reactants, where `V_ref` is the volume of the first reactant; for reactants
    /// sharing one volume this is `k * (NA * V)^(1 - order)`. Michaelis constants
    /// become `Km * NA * V_sub`. Function-driven terms are left as they are.
    pub fn with_volume_scaling(
        &self,
        pool_volume: &dyn Fn(usize) -> f64,
        default_volume: f64,
    ) -> RateTerm {
        match self {
            RateTerm::Bidirectional { forward, backward } => RateTerm::Bidirectional {
                forward: Box::new(forward.with_volume_scaling(pool_volume, default_volume)),
                backward: Box::new(backward.with_volume_scaling(pool_volume, default_volume)),
            },
            RateTerm::MMEnzyme1 { .. } | RateTerm::MMEnzyme { .. } => {
                // reactants() puts the enzyme first.
                let vol = self
                    .reactants()
                    .get(1)
                    .map_or(default_volume, |&i| pool_volume(i));
                let mut scaled = self.clone();
                scaled.set_r1(self.r1() * NA * vol);
                scaled
            }
            RateTerm::FuncRate { .. } | RateTerm::FuncReac { .. } => self.clone(),
            _ => {
                let reactants = self.reactants();
                let v_ref = reactants
                    .first()
                    .map_or(default_volume, |&i| pool_volume(i));
                let factor = reactants
                    .iter()
                    .fold(NA * v_ref, |acc, &i| acc / (NA * pool_volume(i)));
                let mut scaled = self.clone();
                scaled.set_r1(self.r1() * factor);
                scaled
            }
        }
    }
}

fn stoch_propensity(k: f64, v: &[usize], s: &[f64]) -> f64 {
    let mut sorted = v.to_vec();
    sorted.sort_unstable();
    let mut result = k;
    let mut prev: Option<usize> = None;
    let mut repeat = 0.0;
    for i in sorted {
        repeat = if prev == Some(i) { repeat + 1.0 } else { 0.0 };
        let x = s.get(i).copied().unwrap_or(0.0) - repeat;
        if x <= 0.0 {
            return 0.0;
        }
        result *= x;
        prev = Some(i);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    mod construction {
        use super::*;

        #[test]
        fn mass_action_order_follows_reactant_count() {
            assert_eq!(RateTerm::mass_action(1.0, &[]).order(), Some(0));
            assert_eq!(RateTerm::mass_action(1.0, &[3]), RateTerm::FirstOrder { k: 1.0, y: 3 });
            assert_eq!(
                RateTerm::mass_action(1.0, &[0, 1]),
                RateTerm::SecondOrder { k: 1.0, y1: 0, y2: 1 }
            );
            assert_eq!(
                RateTerm::mass_action(1.0, &[0, 1, 1]),
                RateTerm::NOrder { k: 1.0, v: vec![0, 1, 1] }
            );
        }

        #[test]
        fn michaelis_menten_picks_single_substrate_form() {
            assert!(matches!(
                RateTerm::michaelis_menten(1.0, 2.0, 0, &[1]),
                RateTerm::MMEnzyme1 { enz: 0, sub: 1, .. }
            ));
            assert!(matches!(
                RateTerm::michaelis_menten(1.0, 2.0, 0, &[1, 2]),
                RateTerm::MMEnzyme { .. }
            ));
        }

        #[test]
        fn dummy_is_recognised() {
            assert!(RateTerm::dummy().is_dummy());
            assert!(!RateTerm::ZeroOrder { k: 0.5 }.is_dummy());
            assert!(RateTerm::bidirectional(RateTerm::dummy(), RateTerm::dummy()).is_dummy());
            assert!(!RateTerm::bidirectional(RateTerm::dummy(), RateTerm::mass_action(1.0, &[0])).is_dummy());
        }
    }

    mod evaluation {
        use super::*;

        #[test]
        fn mass_action_rates() {
            let s = [2.0, 3.0, 5.0];
            assert_eq!(RateTerm::mass_action(1.5, &[]).rate(&s, 0.0), 1.5);
            assert_eq!(RateTerm::mass_action(2.0, &[1]).rate(&s, 0.0), 6.0);
            assert_eq!(RateTerm::mass_action(2.0, &[0, 2]).rate(&s, 0.0), 20.0);
            assert_eq!(RateTerm::mass_action(1.0, &[0, 1, 2]).rate(&s, 0.0), 30.0);
        }

        #[test]
        fn michaelis_menten_rate() {
            let s = [4.0, 6.0];
            let term = RateTerm::michaelis_menten(2.0, 3.0, 0, &[1]);
            assert!((term.rate(&s, 0.0) - 3.0 * 6.0 * 4.0 / 8.0).abs() < EPS);
        }

        #[test]
        fn bidirectional_is_forward_minus_backward() {
            let s = [10.0, 4.0];
            let term = RateTerm::bidirectional(
                RateTerm::mass_action(2.0, &[0]),
                RateTerm::mass_action(1.0, &[1]),
            );
            assert_eq!(term.rate(&s, 0.0), 16.0);
            assert_eq!(term.r1(), 2.0);
            assert_eq!(term.r2(), 1.0);
            assert_eq!(term.reactants(), vec![0]);
            assert_eq!(term.reverse_reactants(), vec![1]);
        }

        #[test]
        fn stochastic_single_substrate_counts_distinct_pairs() {
            let term = RateTerm::mass_action(0.5, &[0, 0]).into_stochastic();
            assert_eq!(term, RateTerm::StochSecondOrderSingleSubstrate { k: 0.5, y: 0 });
            assert_eq!(term.rate(&[10.0], 0.0), 45.0);
        }

        #[test]
        fn stochastic_n_order_uses_falling_factorial() {
            let term = RateTerm::mass_action(1.0, &[0, 1, 0]).into_stochastic();
            assert!(matches!(term, RateTerm::StochNOrder { .. }));
            // 4 * 3 for the repeated species times 2.
            assert_eq!(term.rate(&[4.0, 2.0], 0.0), 24.0);
            assert_eq!(term.rate(&[1.0, 2.0], 0.0), 0.0);
        }

        #[test]
        fn distinct_second_order_stays_deterministic() {
            let term = RateTerm::mass_action(1.0, &[0, 1]).into_stochastic();
            assert!(matches!(term, RateTerm::SecondOrder { .. }));
        }

        #[test]
        fn func_reac_multiplies_function_into_mass_action() {
            let expr = Expression::compile("x0 * 2.0", 1).unwrap();
            let func = BoundExpression::new(expr, vec![2]).unwrap();
            let term = RateTerm::FuncReac { k: 7.0, v: vec![0, 1], func };
            assert_eq!(term.rate(&[2.0, 3.0, 0.5], 0.0), 6.0);
            assert_eq!(term.r1(), 7.0);
        }
    }

    mod parameters {
        use super::*;

        #[test]
        fn setters_route_to_the_right_constant() {
            let mut mm = RateTerm::michaelis_menten(1.0, 2.0, 0, &[1]);
            mm.set_r1(5.0);
            mm.set_r2(6.0);
            assert_eq!((mm.r1(), mm.r2()), (5.0, 6.0));

            let mut first = RateTerm::mass_action(1.0, &[0]);
            first.set_r2(9.0);
            assert_eq!((first.r1(), first.r2()), (1.0, 0.0));
        }

        #[test]
        fn set_func_expr_ignores_plain_terms() {
            let mut term = RateTerm::mass_action(1.0, &[0]);
            let expr = Expression::compile("x0", 1).unwrap();
            assert_eq!(term.set_func_expr(expr), Ok(false));
            assert!(term.func().is_none());
        }

        #[test]
        fn set_func_expr_reaches_forward_half() {
            let expr = Expression::compile("x0", 1).unwrap();
            let func = BoundExpression::new(expr, vec![1]).unwrap();
            let mut term = RateTerm::bidirectional(
                RateTerm::FuncReac { k: 1.0, v: vec![0], func },
                RateTerm::mass_action(1.0, &[1]),
            );
            let replacement = Expression::compile("x0 * 3.0", 1).unwrap();
            assert_eq!(term.set_func_expr(replacement), Ok(true));
            assert_eq!(term.func().unwrap().expr().source(), "x0 * 3.0");
            assert_eq!(term.rate(&[2.0, 1.0], 0.0), 6.0 - 1.0);
        }
    }

    mod volume_scaling {
        use super::*;

        #[test]
        fn shared_volume_uses_order_power() {
            let vol = 1e-18;
            let ndv = NA * vol;
            let volume = |_: usize| vol;

            let zero = RateTerm::mass_action(2.0, &[]).with_volume_scaling(&volume, vol);
            assert!((zero.r1() - 2.0 * ndv).abs() / (2.0 * ndv) < EPS);

            let first = RateTerm::mass_action(2.0, &[0]).with_volume_scaling(&volume, vol);
            assert!((first.r1() - 2.0).abs() < EPS);

            let second = RateTerm::mass_action(2.0, &[0, 1]).with_volume_scaling(&volume, vol);
            assert!((second.r1() - 2.0 / ndv).abs() / (2.0 / ndv) < EPS);
        }

        #[test]
        fn michaelis_constant_scales_with_substrate_volume() {
            let vol = 2e-18;
            let volume = |_: usize| vol;
            let term = RateTerm::michaelis_menten(0.5, 3.0, 0, &[1]).with_volume_scaling(&volume, vol);
            assert!((term.r1() - 0.5 * NA * vol).abs() / (0.5 * NA * vol) < EPS);
            assert_eq!(term.r2(), 3.0);
        }

        #[test]
        fn bidirectional_scales_each_half() {
            let vol = 1e-18;
            let volume = |_: usize| vol;
            let term = RateTerm::bidirectional(
                RateTerm::mass_action(1.0, &[0, 1]),
                RateTerm::mass_action(3.0, &[2]),
            )
            .with_volume_scaling(&volume, vol);
            assert!((term.r1() - 1.0 / (NA * vol)).abs() / (1.0 / (NA * vol)) < EPS);
            assert!((term.r2() - 3.0).abs() < EPS);
        }
    }
}
