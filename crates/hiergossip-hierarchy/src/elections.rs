//! Diameter-bounded leader election.
//!
//! Every device repeatedly adopts the smallest leader identifier announced
//! by a neighbor, one hop further away than that neighbor. Announcements
//! whose distance reached the diameter bound are not trusted and are
//! replaced by the device's own floor candidate, so a leader's influence
//! stops at the bound and the network splits into partitions of bounded
//! diameter, each led by its smallest identifier.
//!
//! Hysteresis: a device that currently leads itself (distance 0) keeps its
//! role unless the new winner is within the reduced bound. A leader is
//! therefore reluctant to step down when a smaller identifier shows up far
//! away, and competing leaders flap less under churn.
//!
//! Two variants:
//! - [`hysteresis_election`]: the floor candidate is the device itself.
//! - [`partitioned_election`]: only neighbors announcing the same outer
//!   partition leader compete, and the floor candidate is the outer leader
//!   when it is within the bound, so inner partitions nest in outer ones.

use hiergossip_network::{mux, Field, Program, RoundContext};
use hiergossip_protocol::{DeviceId, LeaderRecord};

use crate::levels::DiameterBounds;

/// Keep the previous self-record when it claims leadership and the new
/// winner lies beyond the hysteresis threshold.
fn settle(winner: LeaderRecord, own: LeaderRecord, bounds: DiameterBounds) -> LeaderRecord {
    if winner.hops > bounds.reduced && own.claims_leadership() {
        own
    } else {
        winner
    }
}

/// One round of the hysteresis election.
///
/// `previous` is this device's result from its last round (`None` on the
/// first round, where the device starts as its own leader) and `neighbors`
/// the neighbors' latest results.
pub fn hysteresis_election(
    uid: DeviceId,
    previous: Option<LeaderRecord>,
    neighbors: &Field<LeaderRecord>,
    bounds: DiameterBounds,
) -> LeaderRecord {
    let floor = LeaderRecord::floor(uid);
    let own = previous.unwrap_or(LeaderRecord::own(uid));

    let trusted = neighbors.map(|r| r.within(bounds.diameter));
    let winner = mux(&trusted, neighbors, &floor).min_hood(floor).incremented();

    settle(winner, own, bounds)
}

/// One round of the election restricted to an outer partition.
///
/// `outer` is this device's current leader record at the enclosing level and
/// `neighbor_outer` the outer leader each neighbor announced in its last
/// round. A device at distance `d <= diameter` from its outer leader uses
/// that leader at `d - 1` as floor, so after the increment it follows the
/// outer leader at distance `d`; the outer leader itself (`d = 0`) gets the
/// floor distance `-1` and always leads the inner level.
pub fn partitioned_election(
    uid: DeviceId,
    outer: LeaderRecord,
    previous: Option<LeaderRecord>,
    neighbors: &Field<LeaderRecord>,
    neighbor_outer: &Field<DeviceId>,
    bounds: DiameterBounds,
) -> LeaderRecord {
    let anchor = if outer.hops <= bounds.diameter {
        outer
    } else {
        LeaderRecord::own(uid)
    };
    let floor = anchor.decremented();
    let own = previous.unwrap_or(floor);

    let eligible = neighbor_outer.zip_with(neighbors, |partition, r| {
        *partition == outer.leader && r.within(bounds.diameter)
    });
    let winner = mux(&eligible, neighbors, &floor).min_hood(floor).incremented();

    settle(winner, own, bounds)
}

/// The hysteresis election as a standalone program.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisElection {
    bounds: DiameterBounds,
}

impl HysteresisElection {
    pub fn new(bounds: DiameterBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> DiameterBounds {
        self.bounds
    }
}

impl Program for HysteresisElection {
    type Export = LeaderRecord;
    type Output = LeaderRecord;

    fn round(&self, ctx: &RoundContext<'_, LeaderRecord>) -> (LeaderRecord, LeaderRecord) {
        let neighbors = ctx.neighbor_field(|r| Some(*r));
        let result = hysteresis_election(
            ctx.uid(),
            ctx.previous_self().copied(),
            &neighbors,
            self.bounds,
        );
        if ctx.previous_self().map(|p| p.leader) != Some(result.leader) {
            tracing::trace!(device = %ctx.uid(), leader = %result, "Election leader changed");
        }
        (result, result)
    }
}

/// Export of [`PartitionedElection`]: the outer partition leader the device
/// belongs to, and its inner election result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionedRecord {
    pub outer: LeaderRecord,
    pub inner: LeaderRecord,
}

/// The partition-aware election as a standalone program, with the outer
/// partition of each device supplied by `outer_of`.
pub struct PartitionedElection<F> {
    bounds: DiameterBounds,
    outer_of: F,
}

impl<F> PartitionedElection<F>
where
    F: Fn(DeviceId) -> LeaderRecord,
{
    pub fn new(bounds: DiameterBounds, outer_of: F) -> Self {
        Self { bounds, outer_of }
    }
}

impl<F> Program for PartitionedElection<F>
where
    F: Fn(DeviceId) -> LeaderRecord,
{
    type Export = PartitionedRecord;
    type Output = LeaderRecord;

    fn round(&self, ctx: &RoundContext<'_, PartitionedRecord>) -> (PartitionedRecord, LeaderRecord) {
        let outer = (self.outer_of)(ctx.uid());
        let neighbors = ctx.neighbor_field(|r| Some(r.inner));
        let neighbor_outer = ctx.neighbor_field(|r| Some(r.outer.leader));
        let inner = partitioned_election(
            ctx.uid(),
            outer,
            ctx.previous_self().map(|r| r.inner),
            &neighbors,
            &neighbor_outer,
            self.bounds,
        );
        (PartitionedRecord { outer, inner }, inner)
    }
}
