//! Hierarchical collection: one election and one collection pass per level.
//!
//! A round runs, for every level `i` in `1..=max_level`, an election that
//! yields `leaders[i]`, then an idempotent collection of measurement sets
//! over the level-`i` partitions. The leader of a level folds its collected
//! set into a single entry keyed by itself and carries it to the next
//! level; every other device stops contributing. The value left at the top
//! is the network-wide (or per-partition) aggregate.
//!
//! Orientation decides how partitions nest:
//! - **Bottom-up**: levels are elected independently from 1 upward with the
//!   hysteresis election; a device's level is the last one it still wins.
//! - **Top-down**: levels are elected from `max_level` downward with the
//!   partition-aware election, each gated by the leader one level up; a
//!   device's level is the first one it wins.

use serde::{Deserialize, Serialize};

use hiergossip_network::{Program, RoundContext};
use hiergossip_protocol::{
    DeviceId, Identity, LeaderRecord, MeasurementSet, DEFAULT_DEVICE_COUNT, DEFAULT_HIERARCHY_BASE,
};

use crate::collection::idempotent_collection;
use crate::elections::{hysteresis_election, partitioned_election};
use crate::levels::LevelPlan;
use crate::report::{Appearance, LevelReport};
use crate::HierarchyError;

/// Order in which levels are elected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    BottomUp,
    TopDown,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::BottomUp => write!(f, "bottom-up"),
            Orientation::TopDown => write!(f, "top-down"),
        }
    }
}

/// Configuration of a hierarchical collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Total number of devices, used for the depth and the sentinel leader.
    pub device_count: u64,
    /// Radius growth factor between consecutive levels.
    pub base: u32,
    pub orientation: Orientation,
    pub hysteresis: bool,
    /// Whether rounds produce a [`LevelReport`].
    pub store: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
            base: DEFAULT_HIERARCHY_BASE,
            orientation: Orientation::BottomUp,
            hysteresis: true,
            store: true,
        }
    }
}

/// What a device broadcasts and carries to its next round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyExport<T> {
    /// Leader chain: index 0 is the device itself, `1..=max_level` the
    /// elected records, `max_level + 1` the network-wide sentinel.
    pub leaders: Vec<LeaderRecord>,
    /// Count chain: index 0 is the device's own entry, `1..=max_level` the
    /// collected sets before accumulation.
    pub collected: Vec<MeasurementSet<T>>,
}

impl<T> HierarchyExport<T> {
    pub fn leader(&self, level: usize) -> Option<LeaderRecord> {
        self.leaders.get(level).copied()
    }

    pub fn collected(&self, level: usize) -> Option<&MeasurementSet<T>> {
        self.collected.get(level)
    }
}

/// Result of one hierarchy round at one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyRound<T> {
    /// The accumulated value if this device holds the top-level aggregate,
    /// `null` otherwise.
    pub result: T,
    /// Whether the top-level collected set was non-empty at this device.
    pub holds_aggregate: bool,
    pub report: Option<LevelReport<T>>,
}

/// The hierarchical collection program, generic over the measurement type
/// `T`, its combining function `A` and the per-device value source `V`.
///
/// `accumulate` must be associative and commutative with `null` as identity;
/// this cannot be checked and results are undefined otherwise.
pub struct HierarchicalCollection<T, A, V> {
    config: HierarchyConfig,
    plan: LevelPlan,
    null: T,
    accumulate: A,
    value_of: V,
}

/// The count instantiation: every device contributes 1, summed.
pub type CountingCollection = HierarchicalCollection<u64, fn(u64, u64) -> u64, fn(DeviceId) -> u64>;

fn add(a: u64, b: u64) -> u64 {
    a.saturating_add(b)
}

fn one(_: DeviceId) -> u64 {
    1
}

impl CountingCollection {
    pub fn counting(config: HierarchyConfig) -> Result<Self, HierarchyError> {
        Self::new(config, 0, add as fn(u64, u64) -> u64, one as fn(DeviceId) -> u64)
    }
}

impl<T, A, V> HierarchicalCollection<T, A, V>
where
    T: Clone + PartialOrd,
    A: Fn(T, T) -> T,
    V: Fn(DeviceId) -> T,
{
    pub fn new(config: HierarchyConfig, null: T, accumulate: A, value_of: V) -> Result<Self, HierarchyError> {
        let plan = LevelPlan::new(config.device_count, config.base, config.hysteresis)?;

        tracing::debug!(
            devices = config.device_count,
            base = config.base,
            levels = plan.max_level(),
            orientation = %config.orientation,
            hysteresis = config.hysteresis,
            "Hierarchical collection configured"
        );

        Ok(Self {
            config,
            plan,
            null,
            accumulate,
            value_of,
        })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn plan(&self) -> &LevelPlan {
        &self.plan
    }

    pub fn null(&self) -> &T {
        &self.null
    }

    /// Elect every level bottom-up. Returns the device's level.
    fn elect_bottom_up(
        &self,
        ctx: &RoundContext<'_, HierarchyExport<T>>,
        leaders: &mut [LeaderRecord],
    ) -> Option<usize> {
        let uid = ctx.uid();
        let max_level = self.plan.max_level();
        let previous = ctx.previous_self();
        let mut identity = Identity::new(uid);
        let mut level = None;

        for i in 1..=max_level {
            let neighbors = ctx.neighbor_field(|e| e.leader(i));
            leaders[i] = hysteresis_election(
                uid,
                previous.and_then(|p| p.leader(i)),
                &neighbors,
                self.plan.bounds(i),
            );
            if leaders[i].leader != uid && identity.promote() {
                level = Some(i - 1);
            }
        }
        if leaders[max_level].leader == uid {
            level = Some(max_level);
        }
        level
    }

    /// Elect every level top-down, each inside the partition of the level
    /// above. Returns the device's level.
    fn elect_top_down(
        &self,
        ctx: &RoundContext<'_, HierarchyExport<T>>,
        leaders: &mut [LeaderRecord],
    ) -> Option<usize> {
        let uid = ctx.uid();
        let max_level = self.plan.max_level();
        let previous = ctx.previous_self();
        let mut identity = Identity::new(uid);
        let mut level = None;

        for i in (1..=max_level).rev() {
            let outer = leaders[i + 1];
            let neighbors = ctx.neighbor_field(|e| e.leader(i));
            let neighbor_outer = ctx.neighbor_field(|e| e.leader(i + 1).map(|r| r.leader));
            leaders[i] = partitioned_election(
                uid,
                outer,
                previous.and_then(|p| p.leader(i)),
                &neighbors,
                &neighbor_outer,
                self.plan.bounds(i),
            );
            if identity.is(leaders[i].leader) {
                identity.promote();
                level = Some(i);
            }
        }
        if !identity.is_promoted() {
            level = Some(0);
        }
        level
    }

    /// Run one collection pass per level. Returns the count chain and the
    /// set left after the top level.
    fn collect(
        &self,
        ctx: &RoundContext<'_, HierarchyExport<T>>,
        leaders: &[LeaderRecord],
        value: T,
    ) -> (Vec<MeasurementSet<T>>, MeasurementSet<T>) {
        let uid = ctx.uid();
        let max_level = self.plan.max_level();
        let null = MeasurementSet::new();

        let mut carried = MeasurementSet::singleton(uid, value);
        let mut chain = Vec::with_capacity(max_level + 1);
        chain.push(carried.clone());

        for (i, leader) in leaders.iter().enumerate().take(max_level + 1).skip(1) {
            let neighbor_leaders = ctx.neighbor_field(|e| e.leader(i));
            let neighbor_sets = ctx.neighbor_field(|e| e.collected(i).cloned());
            let collected = idempotent_collection(
                *leader,
                carried,
                &neighbor_leaders,
                &neighbor_sets,
                &null,
                MeasurementSet::merge,
            );
            chain.push(collected.clone());

            carried = if leader.leader == uid && !collected.is_empty() {
                collected.accumulate(uid, &self.accumulate)
            } else {
                MeasurementSet::new()
            };
        }

        (chain, carried)
    }

    /// One round at one device contributing `value`.
    pub fn step(
        &self,
        ctx: &RoundContext<'_, HierarchyExport<T>>,
        value: T,
    ) -> (HierarchyExport<T>, HierarchyRound<T>) {
        let uid = ctx.uid();
        let max_level = self.plan.max_level();

        let mut leaders = vec![LeaderRecord::own(uid); max_level + 2];
        leaders[max_level + 1] = self.plan.global_leader();

        let level = match self.config.orientation {
            Orientation::BottomUp => self.elect_bottom_up(ctx, &mut leaders),
            Orientation::TopDown => self.elect_top_down(ctx, &mut leaders),
        };
        debug_assert!(level.is_some(), "hierarchy level must be assigned after a full pass");
        let level = level.unwrap_or(0);

        let previous_top = ctx
            .previous_self()
            .and_then(|p| p.leader(max_level))
            .map(|r| r.leader);
        if previous_top.is_some_and(|top| top != leaders[max_level].leader) {
            tracing::debug!(
                device = %uid,
                from = ?previous_top,
                to = %leaders[max_level].leader,
                "Top-level leader changed"
            );
        }

        let (chain, top) = self.collect(ctx, &leaders, value);
        let holds_aggregate = !top.is_empty();
        let result = top.into_first_value().unwrap_or_else(|| self.null.clone());

        let report = self.config.store.then(|| {
            let immediate = leaders[level + 1];
            LevelReport {
                level,
                leader: immediate.leader,
                leader_distance: immediate.hops,
                appearance: Appearance::new(uid, level, immediate.leader, self.config.device_count),
                leader_chain: leaders.clone(),
                count_chain: chain.clone(),
            }
        });

        tracing::trace!(device = %uid, level, holds_aggregate, "Hierarchy round completed");

        let export = HierarchyExport {
            leaders,
            collected: chain,
        };
        let round = HierarchyRound {
            result,
            holds_aggregate,
            report,
        };
        (export, round)
    }
}

impl<T, A, V> Program for HierarchicalCollection<T, A, V>
where
    T: Clone + PartialOrd,
    A: Fn(T, T) -> T,
    V: Fn(DeviceId) -> T,
{
    type Export = HierarchyExport<T>;
    type Output = HierarchyRound<T>;

    fn round(&self, ctx: &RoundContext<'_, Self::Export>) -> (Self::Export, Self::Output) {
        self.step(ctx, (self.value_of)(ctx.uid()))
    }
}
