//! A single simulation run: one deployment, every configured variant of the
//! hierarchical count running side by side on it.
//!
//! All variants share the deployment and the seed, so their summaries are
//! directly comparable time by time. With leader relocation enabled, device
//! 0 starts at the left end of the area and jumps to the right end at half
//! the run, forcing the whole hierarchy to re-form around it.

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use hiergossip_hierarchy::{CountingCollection, HierarchyConfig, HierarchyRound, Orientation};
use hiergossip_network::Simulator;
use hiergossip_protocol::DeviceId;

use crate::config::SimConfig;
use crate::deployment::{Area, Deployment};
use crate::SimError;

/// Orientation and hysteresis combination of a counting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Bottom-up, plain elections.
    Bus,
    /// Bottom-up with hysteresis.
    Buh,
    /// Top-down, plain elections.
    Tds,
    /// Top-down with hysteresis.
    Tdh,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Bus, Variant::Buh, Variant::Tds, Variant::Tdh];

    pub fn of(orientation: Orientation, hysteresis: bool) -> Self {
        match (orientation, hysteresis) {
            (Orientation::BottomUp, false) => Variant::Bus,
            (Orientation::BottomUp, true) => Variant::Buh,
            (Orientation::TopDown, false) => Variant::Tds,
            (Orientation::TopDown, true) => Variant::Tdh,
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Variant::Bus | Variant::Buh => Orientation::BottomUp,
            Variant::Tds | Variant::Tdh => Orientation::TopDown,
        }
    }

    pub fn hysteresis(self) -> bool {
        matches!(self, Variant::Buh | Variant::Tdh)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Bus => "bus",
            Variant::Buh => "buh",
            Variant::Tds => "tds",
            Variant::Tdh => "tdh",
        }
    }

    pub fn hierarchy_config(self, device_count: u64, base: u32, store: bool) -> HierarchyConfig {
        HierarchyConfig {
            device_count,
            base,
            orientation: self.orientation(),
            hysteresis: self.hysteresis(),
            store,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::Config(format!("unknown variant: {s}")))
    }
}

/// Round schedule a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Sync,
    Async,
}

impl ScheduleKind {
    pub fn of(synchronous: bool) -> Self {
        if synchronous {
            ScheduleKind::Sync
        } else {
            ScheduleKind::Async
        }
    }

    pub fn is_synchronous(self) -> bool {
        self == ScheduleKind::Sync
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScheduleKind::Sync => "sync",
            ScheduleKind::Async => "async",
        })
    }
}

/// Network-wide observation of one variant at one time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub time: u64,
    /// The true device count.
    pub ideal: u64,
    /// Largest count held by any device.
    pub estimate: u64,
    /// Number of devices holding a top-level aggregate.
    pub holders: usize,
    /// Mean result over devices, 0 for devices holding nothing.
    pub mean: f64,
}

impl RoundSummary {
    pub fn observe<'a, I>(time: u64, ideal: u64, rounds: I) -> Self
    where
        I: IntoIterator<Item = &'a HierarchyRound<u64>>,
    {
        let mut estimate = 0;
        let mut holders = 0;
        let mut total = 0u64;
        let mut observed = 0usize;
        for round in rounds {
            observed += 1;
            if round.holds_aggregate {
                holders += 1;
                estimate = estimate.max(round.result);
                total = total.saturating_add(round.result);
            }
        }
        let mean = if observed == 0 {
            0.0
        } else {
            total as f64 / observed as f64
        };
        Self {
            time,
            ideal,
            estimate,
            holders,
            mean,
        }
    }
}

/// Everything recorded during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub devices: u64,
    pub schedule: ScheduleKind,
    pub summaries: BTreeMap<Variant, Vec<RoundSummary>>,
}

impl RunReport {
    /// Last recorded summary of a variant.
    pub fn last(&self, variant: Variant) -> Option<&RoundSummary> {
        self.summaries.get(&variant)?.last()
    }
}

/// A deployment with one simulator per variant.
pub struct Scenario {
    seed: u64,
    devices: u64,
    schedule: ScheduleKind,
    end_time: u64,
    relocate: bool,
    relocated: bool,
    time: u64,
    deployment: Deployment,
    lanes: Vec<(Variant, Simulator<CountingCollection>)>,
}

impl Scenario {
    /// Deploy the devices for `seed` and build every configured variant.
    /// `store` enables per-device level reports.
    pub fn new(config: &SimConfig, seed: u64, store: bool) -> Result<Self, SimError> {
        config.validate()?;
        let net = &config.network;
        let devices = u32::try_from(net.devices)
            .map_err(|_| SimError::Config(format!("too many devices: {}", net.devices)))?;

        let mut rng = StdRng::seed_from_u64(seed);
        let area = Area::new(net.devices, net.comm, net.squared);
        let mut deployment = Deployment::random(devices, area, net.comm, &mut rng);
        if config.scenario.relocate_leader {
            deployment.move_device(DeviceId(0), area.left_end());
        }

        let topology = deployment.topology();
        tracing::debug!(
            seed,
            devices,
            links = topology.link_count(),
            connected = topology.is_connected(),
            "Deployment ready"
        );

        let mut lanes = Vec::new();
        for variant in config.variants() {
            let program = CountingCollection::counting(variant.hierarchy_config(
                net.devices,
                config.hierarchy.base,
                store,
            ))?;
            let sim = Simulator::new(program, topology.clone(), config.simulator_config(seed))?;
            lanes.push((variant, sim));
        }

        Ok(Self {
            seed,
            devices: net.devices,
            schedule: ScheduleKind::of(config.schedule.synchronous),
            end_time: config.schedule.end_time,
            relocate: config.scenario.relocate_leader,
            relocated: false,
            time: 0,
            deployment,
            lanes,
        })
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn lane(&self, variant: Variant) -> Option<&Simulator<CountingCollection>> {
        self.lanes.iter().find(|(v, _)| *v == variant).map(|(_, sim)| sim)
    }

    /// Move device 0 to the right end and recompute its links everywhere.
    fn relocate_leader(&mut self) -> Result<(), SimError> {
        let target = self.deployment.area().right_end();
        let leader = DeviceId(0);
        if !self.deployment.move_device(leader, target) {
            return Ok(());
        }
        for (_, sim) in &mut self.lanes {
            sim.topology_mut().relink(
                leader,
                target,
                self.deployment.positions(),
                self.deployment.comm(),
            )?;
        }
        self.relocated = true;
        tracing::info!(time = self.time, device = %leader, "Leader relocated");
        Ok(())
    }

    /// Advance every variant by one time unit.
    pub fn step(&mut self) -> Result<(), SimError> {
        let next = self.time + 1;
        if self.relocate && !self.relocated && 2 * next >= self.end_time {
            self.relocate_leader()?;
        }
        for (_, sim) in &mut self.lanes {
            sim.step();
        }
        self.time = next;
        Ok(())
    }

    /// Summaries of every variant at the current time.
    pub fn observe(&self) -> Vec<(Variant, RoundSummary)> {
        self.lanes
            .iter()
            .map(|(variant, sim)| {
                let rounds = sim.outputs().map(|(_, round)| round);
                (*variant, RoundSummary::observe(self.time, self.devices, rounds))
            })
            .collect()
    }

    /// Run to the end time, recording a summary per variant per time unit.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        tracing::info!(
            seed = self.seed,
            devices = self.devices,
            schedule = %self.schedule,
            end_time = self.end_time,
            "Run started"
        );

        let mut summaries: BTreeMap<Variant, Vec<RoundSummary>> = self
            .lanes
            .iter()
            .map(|(v, _)| (*v, Vec::with_capacity(self.end_time as usize)))
            .collect();

        while self.time < self.end_time {
            self.step()?;
            for (variant, summary) in self.observe() {
                summaries.entry(variant).or_default().push(summary);
            }
        }

        for (variant, series) in &summaries {
            if let Some(last) = series.last() {
                tracing::info!(
                    seed = self.seed,
                    %variant,
                    estimate = last.estimate,
                    holders = last.holders,
                    "Run finished"
                );
            }
        }

        Ok(RunReport {
            seed: self.seed,
            devices: self.devices,
            schedule: self.schedule,
            summaries,
        })
    }
}
