use crate::core::models::ids::{CompartmentId, ObjectId};
use std::collections::BTreeMap;

/// Pools read by this reaction system but owned by another compartment's solver.
///
/// Keyed by owning compartment in handle order; each compartment's pools are sorted
/// and deduplicated once [`ProxyMap::normalize`] has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyMap {
    map: BTreeMap<CompartmentId, Vec<ObjectId>>,
}

impl ProxyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, compartment: CompartmentId, pool: ObjectId) {
        self.map.entry(compartment).or_default().push(pool);
    }

    pub fn normalize(&mut self) {
        for pools in self.map.values_mut() {
            pools.sort_unstable();
            pools.dedup();
        }
    }

    /// Drops the given pools from every compartment, removing compartments left empty.
    pub fn retain(&mut self, mut keep: impl FnMut(ObjectId) -> bool) {
        for pools in self.map.values_mut() {
            pools.retain(|&p| keep(p));
        }
        self.map.retain(|_, pools| !pools.is_empty());
    }

    /// Proxy pools owned by `compartment`; empty for a compartment with none.
    pub fn pools(&self, compartment: CompartmentId) -> &[ObjectId] {
        self.map.get(&compartment).map_or(&[], Vec::as_slice)
    }

    /// Compartments that own at least one proxy pool, in handle order.
    pub fn compartments(&self) -> Vec<CompartmentId> {
        self.map.keys().copied().collect()
    }

    /// All proxy pools, grouped by compartment in handle order.
    pub fn all_pools(&self) -> Vec<ObjectId> {
        self.map.values().flatten().copied().collect()
    }

    pub fn contains(&self, pool: ObjectId) -> bool {
        self.map.values().any(|pools| pools.contains(&pool))
    }

    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The foreign compartments an off-solver reaction touches, at most two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignCompartments {
    pub first: CompartmentId,
    pub second: Option<CompartmentId>,
}

/// Collapses the foreign compartments of a reaction's pools into an ordered pair.
///
/// Returns `Ok(None)` for an empty list, and `Err(count)` with the number of distinct
/// compartments when there are more than two. The pair is ordered by handle.
pub fn extract_compartments(
    compartments: &[CompartmentId],
) -> Result<Option<ForeignCompartments>, usize> {
    let mut distinct: Vec<CompartmentId> = compartments.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    match distinct.as_slice() {
        [] => Ok(None),
        [first] => Ok(Some(ForeignCompartments {
            first: *first,
            second: None,
        })),
        [first, second] => Ok(Some(ForeignCompartments {
            first: *first,
            second: Some(*second),
        })),
        more => Err(more.len()),
    }
}

/// Owning compartments of the pools an off-core rate term consumes and produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffCoreCompartments {
    pub substrates: Vec<CompartmentId>,
    pub products: Vec<CompartmentId>,
}
