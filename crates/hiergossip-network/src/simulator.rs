//! In-process neighbor-exchange substrate.
//!
//! Architecture:
//! - `Simulator` owns the topology and one slot per device holding its last
//!   export (stamped with the time it was produced) and last output.
//! - A round gives the device its own last export plus the latest exports
//!   of its current neighbors that are still within the retention window.
//! - `Schedule::Synchronous` fires every device once per time unit against
//!   a frozen snapshot, then swaps all exports at once.
//! - `Schedule::Asynchronous` fires devices one at a time at independently
//!   drawn instants; each firing sees whatever its neighbors last completed.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use hiergossip_protocol::{DeviceId, DEFAULT_RETAIN};

use crate::exchange::{Program, RoundContext};
use crate::field::Field;
use crate::topology::Topology;
use crate::NetworkError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Round cadence of the devices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Schedule {
    /// Every device fires at every integer time.
    Synchronous,
    /// Each device fires first at a uniform instant in `[0, 1)`, then after
    /// periods drawn uniformly from `[1 - jitter, 1 + jitter]`.
    Asynchronous { jitter: f64 },
}

/// Configuration for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub schedule: Schedule,
    /// How long a neighbor's export stays visible after it was produced.
    pub retain: f64,
    /// Seed for the asynchronous firing times.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::Synchronous,
            retain: DEFAULT_RETAIN,
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.retain.is_nan() || self.retain <= 0.0 {
            return Err(NetworkError::InvalidSchedule(format!(
                "retain window must be positive, got {}",
                self.retain
            )));
        }
        if let Schedule::Asynchronous { jitter } = self.schedule {
            if !(0.0..1.0).contains(&jitter) {
                return Err(NetworkError::InvalidSchedule(format!(
                    "jitter must lie in [0, 1), got {}",
                    jitter
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Device slots
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Stamped<E> {
    value: E,
    time: f64,
}

#[derive(Debug)]
struct DeviceSlot<E, O> {
    export: Option<Stamped<E>>,
    output: Option<O>,
    rounds: u64,
    next_fire: f64,
}

impl<E, O> DeviceSlot<E, O> {
    fn new(next_fire: f64) -> Self {
        Self {
            export: None,
            output: None,
            rounds: 0,
            next_fire,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Runs one [`Program`] on every device of a [`Topology`].
pub struct Simulator<P: Program> {
    program: P,
    topology: Topology,
    config: SimulatorConfig,
    slots: BTreeMap<DeviceId, DeviceSlot<P::Export, P::Output>>,
    time: f64,
    rng: StdRng,
}

impl<P: Program> Simulator<P> {
    pub fn new(
        program: P,
        topology: Topology,
        config: SimulatorConfig,
    ) -> Result<Self, NetworkError> {
        config.validate()?;
        let mut simulator = Self {
            program,
            topology,
            config,
            slots: BTreeMap::new(),
            time: 0.0,
            rng: StdRng::seed_from_u64(config.seed),
        };
        simulator.sync_slots();

        tracing::debug!(
            devices = simulator.slots.len(),
            links = simulator.topology.link_count(),
            schedule = ?config.schedule,
            "Simulator created"
        );

        Ok(simulator)
    }

    /// Create slots for devices added to the topology since the last step.
    fn sync_slots(&mut self) {
        let missing: Vec<DeviceId> = self
            .topology
            .devices()
            .filter(|id| !self.slots.contains_key(id))
            .collect();
        for id in missing {
            let first_fire = match self.config.schedule {
                Schedule::Synchronous => self.time + 1.0,
                Schedule::Asynchronous { .. } => self.time + self.rng.gen::<f64>(),
            };
            self.slots.insert(id, DeviceSlot::new(first_fire));
        }
    }

    fn draw_period(&mut self) -> f64 {
        match self.config.schedule {
            Schedule::Synchronous => 1.0,
            Schedule::Asynchronous { jitter } if jitter > 0.0 => {
                self.rng.gen_range(1.0 - jitter..=1.0 + jitter)
            }
            Schedule::Asynchronous { .. } => 1.0,
        }
    }

    fn context_for(&self, id: DeviceId, now: f64) -> RoundContext<'_, P::Export> {
        let retain = self.config.retain;
        let neighbors: Field<&P::Export> = self
            .topology
            .neighbors(id)
            .filter_map(|n| {
                let stamped = self.slots.get(&n)?.export.as_ref()?;
                (now - stamped.time <= retain).then_some((n, &stamped.value))
            })
            .collect();
        let slot = self.slots.get(&id);
        RoundContext::new(
            id,
            slot.map_or(0, |s| s.rounds),
            now,
            slot.and_then(|s| s.export.as_ref()).map(|s| &s.value),
            neighbors,
        )
    }

    fn store(&mut self, id: DeviceId, now: f64, export: P::Export, output: P::Output) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.export = Some(Stamped { value: export, time: now });
            slot.output = Some(output);
            slot.rounds += 1;
        }
    }

    /// Advance simulated time by one unit.
    pub fn step(&mut self) {
        self.sync_slots();
        let end = self.time + 1.0;
        let fired = match self.config.schedule {
            Schedule::Synchronous => self.step_synchronous(end),
            Schedule::Asynchronous { .. } => self.step_asynchronous(end),
        };
        self.time = end;
        tracing::trace!(time = end, fired, "Time step completed");
    }

    fn step_synchronous(&mut self, now: f64) -> usize {
        let results: Vec<(DeviceId, (P::Export, P::Output))> = self
            .slots
            .keys()
            .map(|&id| {
                let ctx = self.context_for(id, now);
                (id, self.program.round(&ctx))
            })
            .collect();
        let fired = results.len();
        for (id, (export, output)) in results {
            self.store(id, now, export, output);
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.next_fire = now + 1.0;
            }
        }
        fired
    }

    fn step_asynchronous(&mut self, end: f64) -> usize {
        let mut fired = 0;
        loop {
            let next = self
                .slots
                .iter()
                .map(|(id, slot)| (*id, slot.next_fire))
                .filter(|(_, at)| *at <= end)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            let Some((id, at)) = next else {
                break;
            };
            let (export, output) = {
                let ctx = self.context_for(id, at);
                self.program.round(&ctx)
            };
            self.store(id, at, export, output);
            let period = self.draw_period();
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.next_fire = at + period;
            }
            fired += 1;
        }
        fired
    }

    /// Step until simulated time reaches `end`.
    pub fn run_until(&mut self, end: f64) {
        while self.time + 1.0 <= end {
            self.step();
        }
    }

    pub fn run_steps(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable access for churn: links changed here are observed from the
    /// next round on.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.slots.keys().copied()
    }

    /// Output of the device's latest round, `None` before it first fires.
    pub fn output(&self, id: DeviceId) -> Option<&P::Output> {
        self.slots.get(&id)?.output.as_ref()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (DeviceId, &P::Output)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.output.as_ref().map(|o| (*id, o)))
    }

    /// Export of the device's latest round.
    pub fn export(&self, id: DeviceId) -> Option<&P::Export> {
        self.slots.get(&id)?.export.as_ref().map(|s| &s.value)
    }

    /// Number of rounds the device has completed.
    pub fn rounds(&self, id: DeviceId) -> u64 {
        self.slots.get(&id).map_or(0, |s| s.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hop count to device 0, or `u32::MAX` when unknown.
    struct HopCount;

    impl Program for HopCount {
        type Export = u32;
        type Output = u32;

        fn round(&self, ctx: &RoundContext<'_, u32>) -> (u32, u32) {
            let hops = if ctx.uid() == DeviceId(0) {
                0
            } else {
                ctx.neighbor_field(|h| Some(h.saturating_add(1)))
                    .min_hood(u32::MAX)
            };
            (hops, hops)
        }
    }

    #[test]
    fn test_synchronous_propagates_one_hop_per_step() {
        let mut sim = Simulator::new(HopCount, Topology::line(5), SimulatorConfig::default()).unwrap();
        assert!(sim.output(DeviceId(4)).is_none());
        sim.run_steps(3);
        assert_eq!(sim.output(DeviceId(2)), Some(&2));
        assert_eq!(sim.output(DeviceId(4)), Some(&u32::MAX));
        sim.run_steps(2);
        assert_eq!(sim.output(DeviceId(4)), Some(&4));
        assert_eq!(sim.rounds(DeviceId(4)), 5);
        assert_eq!(sim.time(), 5.0);
    }

    #[test]
    fn test_asynchronous_converges() {
        let config = SimulatorConfig {
            schedule: Schedule::Asynchronous { jitter: 0.2 },
            retain: 2.0,
            seed: 11,
        };
        let mut sim = Simulator::new(HopCount, Topology::line(6), config).unwrap();
        sim.run_until(20.0);
        for i in 0..6 {
            assert_eq!(sim.output(DeviceId(i)), Some(&i));
        }
    }

    #[test]
    fn test_disconnected_neighbor_drops_out() {
        let mut sim = Simulator::new(HopCount, Topology::line(3), SimulatorConfig::default()).unwrap();
        sim.run_steps(3);
        assert_eq!(sim.output(DeviceId(2)), Some(&2));
        sim.topology_mut().disconnect(DeviceId(1), DeviceId(2)).unwrap();
        sim.step();
        assert_eq!(sim.output(DeviceId(2)), Some(&u32::MAX));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulatorConfig {
            schedule: Schedule::Asynchronous { jitter: 1.5 },
            ..Default::default()
        };
        assert!(Simulator::new(HopCount, Topology::line(2), config).is_err());
        let config = SimulatorConfig {
            retain: 0.0,
            ..Default::default()
        };
        assert!(Simulator::new(HopCount, Topology::line(2), config).is_err());
    }
}
