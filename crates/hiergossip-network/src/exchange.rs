//! Per-round view of the neighbor exchange, and the program interface run
//! by every device.
//!
//! Each device keeps a single "last export" slot. A round reads that slot
//! (`previous_self`) and the latest exports of in-range neighbors, computes
//! a new export, and the simulator replaces the slot when the round ends.
//! A round is a pure function of those inputs.

use hiergossip_protocol::DeviceId;

use crate::field::Field;

/// What a device can observe while executing one round.
#[derive(Debug)]
pub struct RoundContext<'a, E> {
    uid: DeviceId,
    round: u64,
    time: f64,
    previous: Option<&'a E>,
    neighbors: Field<&'a E>,
}

impl<'a, E> RoundContext<'a, E> {
    pub fn new(
        uid: DeviceId,
        round: u64,
        time: f64,
        previous: Option<&'a E>,
        neighbors: Field<&'a E>,
    ) -> Self {
        Self {
            uid,
            round,
            time,
            previous,
            neighbors,
        }
    }

    /// A context for a device that has not heard from anyone yet.
    pub fn isolated(uid: DeviceId) -> Self {
        Self::new(uid, 0, 0.0, None, Field::new())
    }

    pub fn uid(&self) -> DeviceId {
        self.uid
    }

    /// Number of rounds this device completed before the current one.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// This device's own export from its previous round, `None` on its
    /// first round.
    pub fn previous_self(&self) -> Option<&'a E> {
        self.previous
    }

    pub fn neighbors(&self) -> &Field<&'a E> {
        &self.neighbors
    }

    /// Project every neighbor's export. Neighbors for which `project`
    /// yields `None` are left out of the field, the way a neighbor that did
    /// not evaluate the same computation is invisible to it.
    pub fn neighbor_field<U, F>(&self, mut project: F) -> Field<U>
    where
        F: FnMut(&'a E) -> Option<U>,
    {
        self.neighbors.filter_map(|export| project(*export))
    }
}

/// A computation executed by every device once per round.
pub trait Program {
    /// Value broadcast to neighbors and carried to the next round.
    type Export: Clone;
    /// Observational result of a round, never read back by the program.
    type Output;

    fn round(&self, ctx: &RoundContext<'_, Self::Export>) -> (Self::Export, Self::Output);
}
