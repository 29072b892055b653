//! Connectivity between devices: who is currently in range of whom.
//!
//! Links are undirected. Churn is expressed by adding or removing links
//! between rounds; the programs never receive explicit invalidation
//! signals, they only observe a different neighbor field.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use hiergossip_protocol::{DeviceId, Hops};

use crate::NetworkError;

/// Position of a device in the deployment area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Undirected neighbor graph over a set of devices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    adjacency: BTreeMap<DeviceId, BTreeSet<DeviceId>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices `0..n` with no links.
    pub fn with_devices(n: u32) -> Self {
        Self {
            adjacency: (0..n).map(|i| (DeviceId(i), BTreeSet::new())).collect(),
        }
    }

    /// Devices `0..n` linked in a path `0 - 1 - ... - n-1`.
    pub fn line(n: u32) -> Self {
        let mut topology = Self::with_devices(n);
        for i in 1..n {
            topology.link(DeviceId(i - 1), DeviceId(i));
        }
        topology
    }

    /// A `width × height` grid with 4-neighborhood, numbered row by row.
    pub fn grid(width: u32, height: u32) -> Self {
        let mut topology = Self::with_devices(width * height);
        for row in 0..height {
            for col in 0..width {
                let id = row * width + col;
                if col + 1 < width {
                    topology.link(DeviceId(id), DeviceId(id + 1));
                }
                if row + 1 < height {
                    topology.link(DeviceId(id), DeviceId(id + width));
                }
            }
        }
        topology
    }

    /// A connected graph on `0..n`: a random spanning tree plus up to
    /// `extra_links` random additional links.
    pub fn random_connected<R: Rng + ?Sized>(n: u32, extra_links: usize, rng: &mut R) -> Self {
        let mut topology = Self::with_devices(n);
        let mut order: Vec<u32> = (0..n).collect();
        order.shuffle(rng);
        for i in 1..order.len() {
            let parent = order[rng.gen_range(0..i)];
            topology.link(DeviceId(order[i]), DeviceId(parent));
        }
        if n >= 2 {
            for _ in 0..extra_links {
                let a = rng.gen_range(0..n);
                let b = rng.gen_range(0..n);
                if a != b {
                    topology.link(DeviceId(a), DeviceId(b));
                }
            }
        }
        topology
    }

    /// Unit-disk graph: device `i` sits at `positions[i]`, and two devices
    /// are linked when they are within `comm` of each other.
    pub fn unit_disk(positions: &[Point], comm: f64) -> Self {
        let mut topology = Self::with_devices(positions.len() as u32);
        for (i, a) in positions.iter().enumerate() {
            for (j, b) in positions.iter().enumerate().skip(i + 1) {
                if a.distance_to(b) <= comm {
                    topology.link(DeviceId(i as u32), DeviceId(j as u32));
                }
            }
        }
        topology
    }

    fn link(&mut self, a: DeviceId, b: DeviceId) -> bool {
        let added = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        added
    }

    fn require(&self, id: DeviceId) -> Result<(), NetworkError> {
        if self.adjacency.contains_key(&id) {
            Ok(())
        } else {
            Err(NetworkError::UnknownDevice(id))
        }
    }

    /// Add a device with no links. Returns `false` if it already existed.
    pub fn add_device(&mut self, id: DeviceId) -> bool {
        if self.adjacency.contains_key(&id) {
            return false;
        }
        self.adjacency.insert(id, BTreeSet::new());
        true
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn device_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn link_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Current in-range neighbors of `id` (empty for unknown devices).
    pub fn neighbors(&self, id: DeviceId) -> impl Iterator<Item = DeviceId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    pub fn are_linked(&self, a: DeviceId, b: DeviceId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Link two known devices. Returns `false` if they were already linked.
    pub fn connect(&mut self, a: DeviceId, b: DeviceId) -> Result<bool, NetworkError> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Err(NetworkError::SelfLink(a));
        }
        let added = self.link(a, b);
        if added {
            tracing::debug!(%a, %b, "Link established");
        }
        Ok(added)
    }

    /// Remove the link between two known devices. Returns `false` if there
    /// was none.
    pub fn disconnect(&mut self, a: DeviceId, b: DeviceId) -> Result<bool, NetworkError> {
        self.require(a)?;
        self.require(b)?;
        let removed = self.adjacency.get_mut(&a).is_some_and(|n| n.remove(&b));
        if let Some(n) = self.adjacency.get_mut(&b) {
            n.remove(&a);
        }
        if removed {
            tracing::debug!(%a, %b, "Link lost");
        }
        Ok(removed)
    }

    /// Drop every link of `id`, returning its former neighbors.
    pub fn isolate(&mut self, id: DeviceId) -> Result<Vec<DeviceId>, NetworkError> {
        self.require(id)?;
        let former: Vec<DeviceId> = self
            .adjacency
            .get_mut(&id)
            .map(std::mem::take)
            .unwrap_or_default()
            .into_iter()
            .collect();
        for other in &former {
            if let Some(n) = self.adjacency.get_mut(other) {
                n.remove(&id);
            }
        }
        tracing::debug!(device = %id, dropped = former.len(), "Device isolated");
        Ok(former)
    }

    /// Re-link `id` to every device within `comm` of `position`, given the
    /// positions of all devices indexed by identifier.
    pub fn relink(
        &mut self,
        id: DeviceId,
        position: Point,
        positions: &[Point],
        comm: f64,
    ) -> Result<(), NetworkError> {
        self.isolate(id)?;
        for (j, other) in positions.iter().enumerate() {
            let other_id = DeviceId(j as u32);
            if other_id != id && self.contains(other_id) && position.distance_to(other) <= comm {
                self.link(id, other_id);
            }
        }
        Ok(())
    }

    /// Hop distance from `from` to every device reachable from it.
    pub fn hop_distances(&self, from: DeviceId) -> BTreeMap<DeviceId, Hops> {
        let mut distances = BTreeMap::new();
        if !self.contains(from) {
            return distances;
        }
        let mut queue = VecDeque::from([from]);
        distances.insert(from, 0);
        while let Some(current) = queue.pop_front() {
            let d = distances[&current];
            for next in self.neighbors(current) {
                if !distances.contains_key(&next) {
                    distances.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        distances
    }

    /// Connected components, each as an ordered set of devices.
    pub fn components(&self) -> Vec<BTreeSet<DeviceId>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for id in self.devices() {
            if seen.contains(&id) {
                continue;
            }
            let component: BTreeSet<DeviceId> = self.hop_distances(id).into_keys().collect();
            seen.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// Largest hop distance between two devices, or `None` if the graph is
    /// empty or disconnected.
    pub fn diameter(&self) -> Option<Hops> {
        if self.adjacency.is_empty() || !self.is_connected() {
            return None;
        }
        self.devices()
            .filter_map(|id| self.hop_distances(id).into_values().max())
            .max()
    }
}
