use super::classify::Classification;
use crate::core::models::ids::ObjectId;
use std::collections::HashMap;

/// Dense index spaces of a compiled reaction system.
///
/// Pools are indexed variable first, then proxies, then function targets, then
/// buffered pools. Rate slots run through reactions, enzymes, Michaelis-Menten
/// enzymes and increment functions, then the off-solver reactions, enzymes and
/// Michaelis-Menten enzymes from `num_core_rates` on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexLayout {
    pools: Vec<ObjectId>,
    pool_index: HashMap<ObjectId, usize>,
    rate_index: HashMap<ObjectId, usize>,
    func_index: HashMap<ObjectId, usize>,
    num_var: usize,
    num_proxy: usize,
    num_func: usize,
    num_buf: usize,
    num_rates: usize,
    num_core_rates: usize,
    one_way: bool,
}

/// Slots one reaction occupies.
pub fn reac_slots(one_way: bool) -> usize {
    1 + usize::from(one_way)
}

/// Slots one full enzyme occupies.
pub fn enz_slots(one_way: bool) -> usize {
    2 + usize::from(one_way)
}

/// Assigns pool, rate and function indices to a normalized classification.
pub fn allocate(c: &Classification, one_way: bool) -> IndexLayout {
    let mut layout = IndexLayout {
        one_way,
        num_var: c.var_pools.len(),
        num_proxy: c.proxies.len(),
        num_func: c.func_target_pools.len(),
        num_buf: c.buf_pools.len(),
        ..IndexLayout::default()
    };

    let proxies = c.proxies.all_pools();
    for &pool in c
        .var_pools
        .iter()
        .chain(&proxies)
        .chain(&c.func_target_pools)
        .chain(&c.buf_pools)
    {
        layout.pool_index.insert(pool, layout.pools.len());
        layout.pools.push(pool);
    }

    let map = &mut layout.rate_index;
    let mut next = assign_slots(&c.reacs, reac_slots(one_way), 0, map);
    next = assign_slots(&c.enzs, enz_slots(one_way), next, map);
    next = assign_slots(&c.mmenzs, 1, next, map);
    next = assign_slots(&c.increment_funcs, 1, next, map);
    layout.num_core_rates = next;
    next = assign_slots(&c.off_solver_reacs, reac_slots(one_way), next, map);
    next = assign_slots(&c.off_solver_enzs, enz_slots(one_way), next, map);
    next = assign_slots(&c.off_solver_mmenzs, 1, next, map);
    layout.num_rates = next;

    for (i, &func) in c.pool_funcs.iter().enumerate() {
        layout.func_index.insert(func, i);
    }

    layout
}

/// Gives each id `width` consecutive slots from `start`, returning the next free slot.
fn assign_slots(
    ids: &[ObjectId],
    width: usize,
    start: usize,
    map: &mut HashMap<ObjectId, usize>,
) -> usize {
    ids.iter().fold(start, |slot, &id| {
        map.insert(id, slot);
        slot + width
    })
}

impl IndexLayout {
    pub fn pool_index(&self, pool: ObjectId) -> Option<usize> {
        self.pool_index.get(&pool).copied()
    }

    /// First rate slot of a reaction, enzyme or increment function.
    pub fn rate_index(&self, id: ObjectId) -> Option<usize> {
        self.rate_index.get(&id).copied()
    }

    /// Slot of a pool-assigning function among the function terms.
    pub fn func_index(&self, id: ObjectId) -> Option<usize> {
        self.func_index.get(&id).copied()
    }

    pub fn pool_at(&self, index: usize) -> Option<ObjectId> {
        self.pools.get(index).copied()
    }

    /// Pool handles in index order.
    pub fn pools(&self) -> &[ObjectId] {
        &self.pools
    }

    pub fn num_var_pools(&self) -> usize {
        self.num_var
    }

    pub fn num_proxy_pools(&self) -> usize {
        self.num_proxy
    }

    pub fn num_func_pools(&self) -> usize {
        self.num_func
    }

    pub fn num_buf_pools(&self) -> usize {
        self.num_buf
    }

    pub fn num_all_pools(&self) -> usize {
        self.pools.len()
    }

    /// Pools whose values an integrator advances: variables and proxies.
    pub fn num_dynamic_pools(&self) -> usize {
        self.num_var + self.num_proxy
    }

    pub fn num_rates(&self) -> usize {
        self.num_rates
    }

    pub fn num_core_rates(&self) -> usize {
        self.num_core_rates
    }

    pub fn num_funcs(&self) -> usize {
        self.func_index.len()
    }

    pub fn one_way(&self) -> bool {
        self.one_way
    }

    /// `(pool, index)` pairs in index order.
    pub fn pool_id_map(&self) -> Vec<(ObjectId, usize)> {
        self.pools.iter().copied().zip(0..).collect()
    }
}
