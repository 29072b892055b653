use serde::{Deserialize, Serialize};

use crate::identity::DeviceId;

/// Relay hops from a device to a reference device.
///
/// Signed: the value `-1` marks a floor candidate that becomes distance
/// zero once the election increments it.
pub type Hops = i32;

/// A candidate leader together with the hop distance to it.
///
/// Records order lexicographically: the smaller leader identifier wins
/// regardless of distance, and distance only breaks ties between copies
/// of the same leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaderRecord {
    pub leader: DeviceId,
    pub hops: Hops,
}

impl LeaderRecord {
    pub const fn new(leader: DeviceId, hops: Hops) -> Self {
        Self { leader, hops }
    }

    /// The trivial record of a device leading itself.
    pub const fn own(id: DeviceId) -> Self {
        Self::new(id, 0)
    }

    /// The floor candidate for `id`: one hop short of the device itself, so
    /// that after the election's increment it reads as `own(id)`.
    pub const fn floor(id: DeviceId) -> Self {
        Self::new(id, -1)
    }

    pub fn incremented(self) -> Self {
        Self::new(self.leader, self.hops.saturating_add(1))
    }

    pub fn decremented(self) -> Self {
        Self::new(self.leader, self.hops.saturating_sub(1))
    }

    /// Whether the holder of this record considers itself the leader.
    pub fn claims_leadership(&self) -> bool {
        self.hops == 0
    }

    /// Whether the distance is still trusted under a diameter bound.
    pub fn within(&self, diameter: Hops) -> bool {
        self.hops < diameter
    }
}

impl std::fmt::Display for LeaderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.leader, self.hops)
    }
}

/// A value contributed (or accumulated) on behalf of an origin device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry<T> {
    pub origin: DeviceId,
    pub value: T,
}

impl<T> MeasurementEntry<T> {
    pub fn new(origin: DeviceId, value: T) -> Self {
        Self { origin, value }
    }
}

/// A sparse map from origin device to value, kept sorted by origin with
/// unique origins.
///
/// The empty set is the identity of [`MeasurementSet::merge`], and merge is
/// commutative, associative and idempotent, which is what lets collection
/// re-run every round without double counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSet<T> {
    entries: Vec<MeasurementEntry<T>>,
}

impl<T> Default for MeasurementSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MeasurementSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn singleton(origin: DeviceId, value: T) -> Self {
        Self {
            entries: vec![MeasurementEntry::new(origin, value)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[MeasurementEntry<T>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasurementEntry<T>> {
        self.entries.iter()
    }

    pub fn origins(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.entries.iter().map(|e| e.origin)
    }

    /// Look up the value recorded for `origin`.
    pub fn get(&self, origin: DeviceId) -> Option<&T> {
        self.entries
            .binary_search_by_key(&origin, |e| e.origin)
            .ok()
            .map(|idx| &self.entries[idx].value)
    }

    /// Value of the first entry, if any. After accumulation a leader's set
    /// holds exactly one entry, so this is the accumulated value.
    pub fn first_value(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.value)
    }

    pub fn into_first_value(self) -> Option<T> {
        self.entries.into_iter().next().map(|e| e.value)
    }

    /// Fold every value into a single entry keyed by `leader`.
    ///
    /// The first entry's value seeds the fold. An empty set stays empty.
    pub fn accumulate<F>(self, leader: DeviceId, mut accumulate: F) -> Self
    where
        F: FnMut(T, T) -> T,
    {
        let mut entries = self.entries.into_iter();
        let Some(first) = entries.next() else {
            return Self::new();
        };
        let value = entries.fold(first.value, |acc, e| accumulate(acc, e.value));
        Self::singleton(leader, value)
    }
}

impl<T: PartialOrd> MeasurementSet<T> {
    /// Sorted union by origin. When both sides carry the same origin the
    /// smaller value is kept, so merging a set with itself is a no-op.
    pub fn merge(self, other: Self) -> Self {
        let mut merged = Vec::with_capacity(self.entries.len() + other.entries.len());
        let mut xs = self.entries.into_iter().peekable();
        let mut ys = other.entries.into_iter().peekable();

        loop {
            let next = match (xs.peek(), ys.peek()) {
                (Some(x), Some(y)) if x.origin < y.origin => xs.next(),
                (Some(x), Some(y)) if x.origin > y.origin => ys.next(),
                (Some(_), Some(_)) => match (xs.next(), ys.next()) {
                    (Some(x), Some(y)) if y.value < x.value => Some(y),
                    (x, _) => x,
                },
                (Some(_), None) => xs.next(),
                (None, Some(_)) => ys.next(),
                (None, None) => None,
            };
            match next {
                Some(entry) => merged.push(entry),
                None => break,
            }
        }

        Self { entries: merged }
    }
}

impl<T: PartialOrd> FromIterator<(DeviceId, T)> for MeasurementSet<T> {
    fn from_iter<I: IntoIterator<Item = (DeviceId, T)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |acc, (origin, value)| {
                acc.merge(Self::singleton(origin, value))
            })
    }
}
