use crate::core::kinetics::func_term::FuncTerm;
use crate::core::kinetics::rate_term::RateTerm;
use crate::core::math::sparse::SparseMatrix;

/// Per-voxel state an integrator advances: pool counts and rate terms in
/// molecule-number units.
///
/// Vectors are indexed by pool index. Pools owned by another compartment keep the
/// volume of their own compartment and are not touched by a local volume change.
/// A local volume change conserves the molecules of variable pools; buffered pools
/// keep their concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelPools {
    volume: f64,
    n: Vec<f64>,
    n_init: Vec<f64>,
    pool_volumes: Vec<f64>,
    is_local: Vec<bool>,
    is_buffered: Vec<bool>,
    rates: Vec<RateTerm>,
    allow_negative: bool,
}

impl VoxelPools {
    /// Creates a voxel whose pools start at `n_init`.
    ///
    /// `pool_volumes`, `is_local` and `is_buffered` must have one entry per pool.
    pub fn new(
        volume: f64,
        pool_volumes: Vec<f64>,
        is_local: Vec<bool>,
        is_buffered: Vec<bool>,
        n_init: Vec<f64>,
        allow_negative: bool,
    ) -> Self {
        Self {
            volume,
            n: n_init.clone(),
            n_init,
            pool_volumes,
            is_local,
            is_buffered,
            rates: Vec::new(),
            allow_negative,
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn n_init(&self) -> &[f64] {
        &self.n_init
    }

    pub fn pool_volume(&self, pool: usize) -> f64 {
        self.pool_volumes.get(pool).copied().unwrap_or(self.volume)
    }

    /// Rate terms scaled to this voxel.
    pub fn rates(&self) -> &[RateTerm] {
        &self.rates
    }

    fn scale(&self, term: &RateTerm) -> RateTerm {
        let volume = |pool: usize| self.pool_volume(pool);
        term.with_volume_scaling(&volume, self.volume)
    }

    /// Rebuilds every scaled term from the concentration-unit master terms.
    ///
    /// Reuses the existing buffer when the number of terms is unchanged.
    pub fn refresh_rates(&mut self, master: &[RateTerm]) {
        if self.rates.len() != master.len() {
            self.rates = master.iter().map(|term| self.scale(term)).collect();
            return;
        }
        for (i, term) in master.iter().enumerate() {
            let scaled = self.scale(term);
            self.rates[i] = scaled;
        }
    }

    /// Rebuilds one scaled term after its master changed.
    pub fn update_rate(&mut self, index: usize, master: &RateTerm) {
        let scaled = self.scale(master);
        if let Some(slot) = self.rates.get_mut(index) {
            *slot = scaled;
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        if self.allow_negative {
            value
        } else {
            value.max(0.0)
        }
    }

    pub fn set_n(&mut self, pool: usize, value: f64) -> bool {
        let value = self.clamp(value);
        match self.n.get_mut(pool) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn set_n_init(&mut self, pool: usize, value: f64) -> bool {
        let value = self.clamp(value);
        match self.n_init.get_mut(pool) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Resets every pool to its initial count.
    pub fn reinit(&mut self) {
        self.n.copy_from_slice(&self.n_init);
    }

    /// Multiplies the voxel volume by `ratio`.
    ///
    /// Initial counts of local pools follow the volume at fixed concentration.
    /// Variable pools keep their current molecules and buffered pools are reset to
    /// the scaled initial count. Rate terms are rebuilt in place from `master`.
    pub fn scale_volume(&mut self, ratio: f64, master: &[RateTerm]) {
        self.volume *= ratio;
        for (i, local) in self.is_local.iter().enumerate() {
            if !*local {
                continue;
            }
            self.pool_volumes[i] *= ratio;
            self.n_init[i] *= ratio;
            if self.is_buffered.get(i).copied().unwrap_or(false) {
                self.n[i] = self.n_init[i];
            }
        }
        self.refresh_rates(master);
    }

    /// Current value of every rate term.
    pub fn rate_values(&self, t: f64) -> Vec<f64> {
        self.rates.iter().map(|term| term.rate(&self.n, t)).collect()
    }

    /// Rates of change of every pool; only the first `num_dynamic` pools move.
    pub fn derivatives(&self, matrix: &SparseMatrix<i32>, num_dynamic: usize, t: f64) -> Vec<f64> {
        let rates = self.rate_values(t);
        let mut dydt = vec![0.0; self.n.len()];
        let dynamic = num_dynamic.min(dydt.len());
        matrix.add_derivatives(&rates, &mut dydt[..dynamic]);
        dydt
    }

    /// Assigns every function-controlled pool from the current counts.
    pub fn update_funcs(&mut self, funcs: &[FuncTerm], t: f64) {
        for func in funcs {
            func.eval_pool(&mut self.n, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kinetics::NA;
    use crate::core::kinetics::expr::Expression;
    use crate::core::kinetics::func_term::BoundExpression;

    const VOL: f64 = 1e-18;

    fn two_pool_voxel(allow_negative: bool) -> VoxelPools {
        VoxelPools::new(
            VOL,
            vec![VOL, 2.0 * VOL],
            vec![true, false],
            vec![false, false],
            vec![100.0, 50.0],
            allow_negative,
        )
    }

    fn var_and_buffered_voxel() -> VoxelPools {
        VoxelPools::new(
            VOL,
            vec![VOL, VOL],
            vec![true, true],
            vec![false, true],
            vec![100.0, 40.0],
            false,
        )
    }

    #[test]
    fn refresh_scales_master_terms_to_numbers() {
        let mut voxel = two_pool_voxel(false);
        voxel.refresh_rates(&[
            RateTerm::mass_action(3.0, &[0]),
            RateTerm::mass_action(3.0, &[0, 0]),
        ]);
        assert_eq!(voxel.rates()[0].r1(), 3.0);
        let expected = 3.0 / (NA * VOL);
        assert!((voxel.rates()[1].r1() - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn counts_clamp_unless_negative_allowed() {
        let mut voxel = two_pool_voxel(false);
        assert!(voxel.set_n(0, -5.0));
        assert_eq!(voxel.n()[0], 0.0);
        assert!(!voxel.set_n(7, 1.0));

        let mut loose = two_pool_voxel(true);
        loose.set_n(0, -5.0);
        assert_eq!(loose.n()[0], -5.0);
        loose.reinit();
        assert_eq!(loose.n(), &[100.0, 50.0]);
    }

    #[test]
    fn scale_volume_touches_only_local_pools() {
        let mut voxel = two_pool_voxel(false);
        let master = [RateTerm::mass_action(1.0, &[0, 1])];
        voxel.refresh_rates(&master);
        let before = voxel.rates()[0].r1();

        voxel.scale_volume(2.0, &master);
        assert_eq!(voxel.volume(), 2.0 * VOL);
        assert_eq!(voxel.n(), &[100.0, 50.0]);
        assert_eq!(voxel.n_init(), &[200.0, 50.0]);
        assert_eq!(voxel.pool_volume(1), 2.0 * VOL);
        // k * NA * V0 / (NA * V0 * NA * V1): only the foreign volume is left.
        assert!((voxel.rates()[0].r1() - before).abs() / before < 1e-12);
    }

    #[test]
    fn scale_volume_conserves_variable_molecules() {
        let mut voxel = var_and_buffered_voxel();
        voxel.set_n(0, 70.0);
        voxel.scale_volume(2.0, &[]);
        assert_eq!(voxel.n(), &[70.0, 80.0]);
        assert_eq!(voxel.n_init(), &[200.0, 80.0]);

        voxel.scale_volume(0.5, &[]);
        assert_eq!(voxel.n(), &[70.0, 40.0]);
    }

    #[test]
    fn scale_volume_reuses_the_rate_buffer() {
        let mut voxel = var_and_buffered_voxel();
        let master = [
            RateTerm::mass_action(1.0, &[0, 1]),
            RateTerm::mass_action(2.0, &[0]),
        ];
        voxel.refresh_rates(&master);
        let buffer = voxel.rates().as_ptr();
        let before = voxel.rates()[0].r1();

        voxel.scale_volume(2.0, &master);
        assert_eq!(voxel.rates().as_ptr(), buffer);
        assert!((voxel.rates()[0].r1() - before / 2.0).abs() / before < 1e-12);
        assert_eq!(voxel.rates()[1].r1(), 2.0);
    }

    #[test]
    fn derivatives_follow_the_matrix() {
        let mut voxel = two_pool_voxel(false);
        voxel.refresh_rates(&[RateTerm::mass_action(0.1, &[0])]);
        let mut n = SparseMatrix::with_size(2, 1);
        n.set(0, 0, -1);
        n.set(1, 0, 1);

        let dydt = voxel.derivatives(&n, 2, 0.0);
        assert!((dydt[0] + 10.0).abs() < 1e-12);
        assert!((dydt[1] - 10.0).abs() < 1e-12);

        let frozen = voxel.derivatives(&n, 1, 0.0);
        assert_eq!(frozen[1], 0.0);
    }

    #[test]
    fn update_funcs_assigns_target_pools() {
        let mut voxel = two_pool_voxel(false);
        let expr = Expression::compile("x0 + 1.0", 1).unwrap();
        let func = FuncTerm::new(BoundExpression::new(expr, vec![0]).unwrap(), 1, 1.0);
        voxel.update_funcs(&[func], 0.0);
        assert_eq!(voxel.n()[1], 101.0);
    }
}
