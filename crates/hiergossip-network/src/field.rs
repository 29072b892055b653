//! Neighbor fields: the values most recently announced by a device's
//! in-range neighbors, keyed by neighbor.
//!
//! A field never contains the observing device itself. Reductions take the
//! device's own contribution explicitly (`fallback` for [`Field::min_hood`],
//! `seed` for [`Field::fold_hood`]).

use std::collections::BTreeMap;

use hiergossip_protocol::DeviceId;

/// A value per neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    values: BTreeMap<DeviceId, T>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Field<T> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, neighbor: DeviceId, value: T) -> Option<T> {
        self.values.insert(neighbor, value)
    }

    pub fn get(&self, neighbor: DeviceId) -> Option<&T> {
        self.values.get(&neighbor)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Neighbors in the domain of this field, in identifier order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &T)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.values()
    }

    /// Apply `f` to every neighbor value.
    pub fn map<U, F>(&self, mut f: F) -> Field<U>
    where
        F: FnMut(&T) -> U,
    {
        Field {
            values: self.values.iter().map(|(id, v)| (*id, f(v))).collect(),
        }
    }

    /// Apply `f` to every neighbor value, dropping neighbors for which it
    /// yields `None`.
    pub fn filter_map<U, F>(&self, mut f: F) -> Field<U>
    where
        F: FnMut(&T) -> Option<U>,
    {
        Field {
            values: self
                .values
                .iter()
                .filter_map(|(id, v)| f(v).map(|u| (*id, u)))
                .collect(),
        }
    }

    /// Combine two fields pointwise. The result is defined on neighbors
    /// present in both.
    pub fn zip_with<U, V, F>(&self, other: &Field<U>, mut f: F) -> Field<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        Field {
            values: self
                .values
                .iter()
                .filter_map(|(id, t)| other.values.get(id).map(|u| (*id, f(t, u))))
                .collect(),
        }
    }

    /// Fold every neighbor value into `seed`, which stands for the
    /// observing device's own contribution.
    pub fn fold_hood<F>(self, mut combine: F, seed: T) -> T
    where
        F: FnMut(T, T) -> T,
    {
        self.values
            .into_values()
            .fold(seed, |acc, value| combine(acc, value))
    }
}

impl<T: Ord> Field<T> {
    /// Minimum of `fallback` and every neighbor value.
    pub fn min_hood(self, fallback: T) -> T {
        self.values
            .into_values()
            .fold(fallback, |best, value| if value < best { value } else { best })
    }
}

impl<T> FromIterator<(DeviceId, T)> for Field<T> {
    fn from_iter<I: IntoIterator<Item = (DeviceId, T)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Elementwise selection: `if_true` where `condition` holds, `if_false`
/// elsewhere. Defined on neighbors present in both fields.
pub fn mux<T: Clone>(condition: &Field<bool>, if_true: &Field<T>, if_false: &T) -> Field<T> {
    condition.zip_with(if_true, |keep, value| {
        if *keep {
            value.clone()
        } else {
            if_false.clone()
        }
    })
}
