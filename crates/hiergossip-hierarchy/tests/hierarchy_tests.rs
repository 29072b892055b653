//! Tests for hierarchical collection.
//!
//! Verifies:
//! - Level assignment and immediate leaders on a small line
//! - Conservation: the top leader counts every device exactly once
//! - Idempotence: an extra round after convergence changes nothing
//! - The stranded follower left by top-down hysteresis
//! - Re-convergence after a partition split
//! - Degenerate networks and asynchronous schedules

use hiergossip_hierarchy::orchestrator::{
    CountingCollection, HierarchicalCollection, HierarchyConfig, Orientation,
};
use hiergossip_network::{Program, Schedule, Simulator, SimulatorConfig, Topology};
use hiergossip_protocol::{DeviceId, LeaderRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;

const ORIENTATIONS: [Orientation; 2] = [Orientation::BottomUp, Orientation::TopDown];

fn config(devices: u64, orientation: Orientation, hysteresis: bool) -> HierarchyConfig {
    HierarchyConfig {
        device_count: devices,
        base: 2,
        orientation,
        hysteresis,
        store: true,
    }
}

fn counting(topology: Topology, cfg: HierarchyConfig, steps: u64) -> Simulator<CountingCollection> {
    let program = CountingCollection::counting(cfg).expect("valid hierarchy config");
    let mut sim = Simulator::new(program, topology, SimulatorConfig::default()).unwrap();
    sim.run_steps(steps);
    sim
}

/// Devices holding a top-level aggregate, with their result.
fn holders<P>(sim: &Simulator<P>) -> Vec<(DeviceId, u64)>
where
    P: Program<Output = hiergossip_hierarchy::HierarchyRound<u64>>,
{
    sim.outputs()
        .filter(|(_, round)| round.holds_aggregate)
        .map(|(id, round)| (id, round.result))
        .collect()
}

// ═══════════════════════════════════════════════════════════════
// Line of four devices, base 2
// ═══════════════════════════════════════════════════════════════

#[test]
fn line_of_four_assigns_levels() {
    for orientation in ORIENTATIONS {
        let sim = counting(Topology::line(4), config(4, orientation, true), 30);
        assert_eq!(sim.program().plan().max_level(), 2);

        let levels: Vec<usize> = sim
            .outputs()
            .map(|(_, r)| r.report.as_ref().unwrap().level)
            .collect();
        assert_eq!(levels, vec![2, 0, 1, 0], "{orientation}");

        let d0 = sim.output(DeviceId(0)).unwrap().report.as_ref().unwrap();
        assert_eq!(d0.leader, DeviceId(4), "top leader reports the sentinel");
        assert_eq!(d0.leader_distance, 4);

        let d2 = sim.output(DeviceId(2)).unwrap().report.as_ref().unwrap();
        assert_eq!((d2.leader, d2.leader_distance), (DeviceId(0), 2));

        let d3 = sim.output(DeviceId(3)).unwrap().report.as_ref().unwrap();
        assert_eq!((d3.leader, d3.leader_distance), (DeviceId(2), 1));
        assert_eq!(d3.leader_chain[1], LeaderRecord::new(DeviceId(2), 1));
        assert_eq!(d3.leader_chain[2], LeaderRecord::new(DeviceId(0), 3));
    }
}

#[test]
fn line_of_four_counts_at_top_leader() {
    for orientation in ORIENTATIONS {
        let sim = counting(Topology::line(4), config(4, orientation, true), 30);
        assert_eq!(holders(&sim), vec![(DeviceId(0), 4)], "{orientation}");
        assert_eq!(sim.output(DeviceId(1)).unwrap().result, 0);
    }
}

#[test]
fn intermediate_leader_accumulates_its_partition() {
    let sim = counting(Topology::line(4), config(4, Orientation::BottomUp, true), 30);
    let d2 = sim.output(DeviceId(2)).unwrap().report.as_ref().unwrap();
    // Level 1 partition {2, 3} collected at d2 before accumulation.
    assert_eq!(d2.count_chain[1].len(), 2);
    assert_eq!(sim.export(DeviceId(2)).unwrap().collected(1).unwrap().len(), 2);
}

// ═══════════════════════════════════════════════════════════════
// Conservation and idempotence
// ═══════════════════════════════════════════════════════════════

#[test]
fn counts_every_device_on_random_graphs() {
    for orientation in ORIENTATIONS {
        for seed in 0..3 {
            let mut rng = StdRng::seed_from_u64(seed);
            let topology = Topology::random_connected(20, 10, &mut rng);
            let sim = counting(topology, config(20, orientation, false), 200);
            assert_eq!(holders(&sim), vec![(DeviceId(0), 20)], "{orientation} seed {seed}");
        }
    }
}

#[test]
fn multipath_sum_counts_each_value_once() {
    for orientation in ORIENTATIONS {
        let program = HierarchicalCollection::new(
            config(16, orientation, true),
            0u64,
            |a: u64, b: u64| a + b,
            |id: DeviceId| u64::from(id.as_u32()) + 1,
        )
        .unwrap();
        let mut sim = Simulator::new(program, Topology::grid(4, 4), SimulatorConfig::default()).unwrap();
        sim.run_steps(100);

        let top = sim.output(DeviceId(0)).unwrap();
        assert!(top.holds_aggregate);
        assert_eq!(top.result, (1..=16).sum::<u64>(), "{orientation}");
    }
}

#[test]
fn extra_round_after_convergence_changes_nothing() {
    for orientation in ORIENTATIONS {
        let mut sim = counting(Topology::grid(3, 4), config(12, orientation, true), 100);
        let before: Vec<_> = sim.outputs().map(|(id, r)| (id, r.clone())).collect();
        sim.step();
        let after: Vec<_> = sim.outputs().map(|(id, r)| (id, r.clone())).collect();
        assert_eq!(before, after, "{orientation}");
    }
}

/// Path 1 - 0 - 3 - 2 - 4.
fn shuffled_path() -> Topology {
    let mut topology = Topology::with_devices(5);
    for (a, b) in [(1, 0), (0, 3), (3, 2), (2, 4)] {
        topology.connect(DeviceId(a), DeviceId(b)).unwrap();
    }
    topology
}

#[test]
fn top_down_hysteresis_can_strand_a_far_follower() {
    // d2 keeps its own level-2 role, while d4 anchors on the outer leader
    // d0 and has no same-leader neighbor closer to it.
    let sim = counting(shuffled_path(), config(5, Orientation::TopDown, true), 200);
    assert_eq!(holders(&sim), vec![(DeviceId(0), 4)]);

    let d2 = sim.output(DeviceId(2)).unwrap().report.as_ref().unwrap();
    assert_eq!(d2.leader_chain[2], LeaderRecord::new(DeviceId(2), 0));
    let d4 = sim.output(DeviceId(4)).unwrap().report.as_ref().unwrap();
    assert_eq!(d4.leader_chain[2], LeaderRecord::new(DeviceId(0), 3));
    assert_eq!(d4.level, 1);

    let later = counting(shuffled_path(), config(5, Orientation::TopDown, true), 400);
    assert_eq!(holders(&later), vec![(DeviceId(0), 4)]);
}

#[test]
fn other_variants_count_the_shuffled_path() {
    for (orientation, hysteresis) in [
        (Orientation::TopDown, false),
        (Orientation::BottomUp, true),
        (Orientation::BottomUp, false),
    ] {
        let sim = counting(shuffled_path(), config(5, orientation, hysteresis), 200);
        assert_eq!(holders(&sim), vec![(DeviceId(0), 5)], "{orientation} {hysteresis}");
    }
}

// ═══════════════════════════════════════════════════════════════
// Churn
// ═══════════════════════════════════════════════════════════════

#[test]
fn split_network_reconverges_per_side() {
    for orientation in ORIENTATIONS {
        let mut sim = counting(Topology::line(6), config(6, orientation, false), 60);
        assert_eq!(holders(&sim), vec![(DeviceId(0), 6)]);

        sim.topology_mut().disconnect(DeviceId(2), DeviceId(3)).unwrap();
        sim.run_steps(60);
        assert_eq!(
            holders(&sim),
            vec![(DeviceId(0), 3), (DeviceId(3), 3)],
            "{orientation}"
        );
    }
}

#[test]
fn asynchronous_schedule_converges() {
    let program = CountingCollection::counting(config(8, Orientation::BottomUp, false)).unwrap();
    let sim_config = SimulatorConfig {
        schedule: Schedule::Asynchronous { jitter: 0.1 },
        seed: 7,
        ..SimulatorConfig::default()
    };
    let mut sim = Simulator::new(program, Topology::line(8), sim_config).unwrap();
    sim.run_until(200.0);
    assert_eq!(holders(&sim), vec![(DeviceId(0), 8)]);
}

// ═══════════════════════════════════════════════════════════════
// Degenerate networks
// ═══════════════════════════════════════════════════════════════

#[test]
fn single_device_counts_itself() {
    for orientation in ORIENTATIONS {
        let sim = counting(Topology::with_devices(1), config(1, orientation, true), 3);
        let round = sim.output(DeviceId(0)).unwrap();
        assert_eq!(round.result, 1);
        assert_eq!(round.report.as_ref().unwrap().level, 0);
    }
}

#[test]
fn empty_network_runs() {
    let sim = counting(Topology::new(), config(0, Orientation::TopDown, true), 3);
    assert_eq!(sim.outputs().count(), 0);
    assert_eq!(sim.program().plan().max_level(), 0);
}

#[test]
fn isolated_devices_each_hold_themselves() {
    let sim = counting(Topology::with_devices(3), config(3, Orientation::BottomUp, true), 5);
    assert_eq!(
        holders(&sim),
        vec![(DeviceId(0), 1), (DeviceId(1), 1), (DeviceId(2), 1)]
    );
}
