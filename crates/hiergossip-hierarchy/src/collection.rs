//! Idempotent collection inside the partitions of an election.
//!
//! Every round a device folds its own contribution with the previous-round
//! values of the neighbors that sit strictly farther from the same leader.
//! Values therefore only travel toward the leader, never sideways or back,
//! and with an idempotent `accumulate` a value reaching the leader along
//! several paths is still counted once. Under an unchanged partition the
//! result reaches a fixed point; after a split, the leader identifier check
//! makes each side forget the other within a few rounds.

use hiergossip_network::{mux, Field, Program, RoundContext};
use hiergossip_protocol::{DeviceId, LeaderRecord};

use crate::elections::hysteresis_election;
use crate::levels::DiameterBounds;

/// One round of collection toward the leader of `leader`.
///
/// `neighbor_leaders` and `neighbor_values` are the neighbors' leader
/// records and collected values from their last round. `null` must be an
/// identity of `accumulate`.
pub fn idempotent_collection<T, F>(
    leader: LeaderRecord,
    value: T,
    neighbor_leaders: &Field<LeaderRecord>,
    neighbor_values: &Field<T>,
    null: &T,
    accumulate: F,
) -> T
where
    T: Clone,
    F: FnMut(T, T) -> T,
{
    let upstream = neighbor_leaders.map(|r| r.hops > leader.hops && r.leader == leader.leader);
    mux(&upstream, neighbor_values, null).fold_hood(accumulate, value)
}

/// Export of [`ElectedCollection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub leader: LeaderRecord,
    pub value: T,
}

/// A single-level hysteresis election followed by collection of every
/// device's value toward the elected leader.
pub struct ElectedCollection<T, A, V> {
    bounds: DiameterBounds,
    null: T,
    accumulate: A,
    value_of: V,
}

impl<T, A, V> ElectedCollection<T, A, V>
where
    T: Clone,
    A: Fn(T, T) -> T,
    V: Fn(DeviceId) -> T,
{
    pub fn new(bounds: DiameterBounds, null: T, accumulate: A, value_of: V) -> Self {
        Self {
            bounds,
            null,
            accumulate,
            value_of,
        }
    }
}

impl<T, A, V> Program for ElectedCollection<T, A, V>
where
    T: Clone,
    A: Fn(T, T) -> T,
    V: Fn(DeviceId) -> T,
{
    type Export = Collected<T>;
    type Output = Collected<T>;

    fn round(&self, ctx: &RoundContext<'_, Collected<T>>) -> (Collected<T>, Collected<T>) {
        let nbr_leaders = ctx.neighbor_field(|c| Some(c.leader));
        let leader = hysteresis_election(
            ctx.uid(),
            ctx.previous_self().map(|c| c.leader),
            &nbr_leaders,
            self.bounds,
        );
        let value = idempotent_collection(
            leader,
            (self.value_of)(ctx.uid()),
            &nbr_leaders,
            &ctx.neighbor_field(|c| Some(c.value.clone())),
            &self.null,
            &self.accumulate,
        );
        let collected = Collected { leader, value };
        (collected.clone(), collected)
    }
}
