use super::ids::VarId;
use std::collections::BTreeMap;

/// A sparse vector of floats keyed by variable identity.
///
/// Used for gradients, design-variable snapshots, step scales and tolerances.
/// Ordering by [`VarId`] keeps iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarVector {
    entries: BTreeMap<VarId, f64>,
}

impl VarVector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: VarId) -> Option<f64> {
        self.entries.get(&id).copied()
    }

    pub fn insert(&mut self, id: VarId, value: f64) -> Option<f64> {
        self.entries.insert(id, value)
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = VarId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// Dot product over the keys present in both vectors.
    pub fn dot(&self, other: &VarVector) -> f64 {
        self.entries
            .iter()
            .filter_map(|(k, v)| other.entries.get(k).map(|w| v * w))
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Element-wise difference over the keys of `self`; missing keys in `other` count as zero.
    pub fn sub(&self, other: &VarVector) -> VarVector {
        self.iter()
            .map(|(k, v)| (k, v - other.get(k).unwrap_or(0.0)))
            .collect()
    }
}

impl FromIterator<(VarId, f64)> for VarVector {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VarVector {
    type Item = (&'a VarId, &'a f64);
    type IntoIter = std::collections::btree_map::Iter<'a, VarId, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
