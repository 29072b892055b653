//! Tests for the diameter-bounded elections.
//!
//! Verifies:
//! - Convergence to the smallest identifier when the bound covers the network
//! - Partitions of bounded diameter on long lines
//! - Hysteresis keeping a distant self-leader in place
//! - Nesting of the partition-aware election inside outer partitions

use hiergossip_hierarchy::elections::{hysteresis_election, HysteresisElection, PartitionedElection};
use hiergossip_hierarchy::levels::DiameterBounds;
use hiergossip_network::{Field, Simulator, SimulatorConfig, Topology};
use hiergossip_protocol::{DeviceId, LeaderRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn run_election(topology: Topology, bounds: DiameterBounds, steps: u64) -> Simulator<HysteresisElection> {
    let mut sim = Simulator::new(HysteresisElection::new(bounds), topology, SimulatorConfig::default())
        .expect("valid simulator");
    sim.run_steps(steps);
    sim
}

fn leader_of(sim: &Simulator<HysteresisElection>, id: u32) -> LeaderRecord {
    *sim.output(DeviceId(id)).expect("device has run")
}

// ═══════════════════════════════════════════════════════════════
// Hysteresis election
// ═══════════════════════════════════════════════════════════════

#[test]
fn election_converges_to_minimum_on_random_graphs() {
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let topology = Topology::random_connected(20, 10, &mut rng);
        let distances = topology.hop_distances(DeviceId(0));
        let sim = run_election(topology, DiameterBounds::without_hysteresis(31), 60);

        for (id, record) in sim.outputs() {
            assert_eq!(record.leader, DeviceId(0), "seed {seed}: {id} follows {record}");
            assert_eq!(record.hops, distances[&id], "seed {seed}: hop count of {id}");
        }
    }
}

#[test]
fn election_bounds_partition_diameter() {
    // Diameter 1: only neighbors that lead themselves are trusted, so a line
    // splits into pairs.
    let sim = run_election(Topology::line(4), DiameterBounds::new(1, 1), 10);
    assert_eq!(leader_of(&sim, 0), LeaderRecord::new(DeviceId(0), 0));
    assert_eq!(leader_of(&sim, 1), LeaderRecord::new(DeviceId(0), 1));
    assert_eq!(leader_of(&sim, 2), LeaderRecord::new(DeviceId(2), 0));
    assert_eq!(leader_of(&sim, 3), LeaderRecord::new(DeviceId(2), 1));
}

#[test]
fn election_on_line_with_reduced_bound_elects_single_leader() {
    let sim = run_election(Topology::line(4), DiameterBounds::new(3, 1), 10);
    for id in 0..4 {
        assert_eq!(leader_of(&sim, id), LeaderRecord::new(DeviceId(0), id as i32));
    }
}

#[test]
fn election_is_stable_once_converged() {
    let mut sim = run_election(Topology::grid(4, 4), DiameterBounds::new(7, 3), 40);
    let before: Vec<LeaderRecord> = sim.outputs().map(|(_, r)| *r).collect();
    sim.step();
    let after: Vec<LeaderRecord> = sim.outputs().map(|(_, r)| *r).collect();
    assert_eq!(before, after);
}

fn path_0_5_3() -> Topology {
    let mut topology = Topology::new();
    for id in [0, 5, 3] {
        topology.add_device(DeviceId(id));
    }
    topology.connect(DeviceId(0), DeviceId(5)).unwrap();
    topology.connect(DeviceId(5), DeviceId(3)).unwrap();
    topology
}

#[test]
fn hysteresis_keeps_distant_self_leader() {
    let sim = run_election(path_0_5_3(), DiameterBounds::new(6, 1), 10);
    assert_eq!(leader_of(&sim, 5), LeaderRecord::new(DeviceId(0), 1));
    assert_eq!(
        leader_of(&sim, 3),
        LeaderRecord::own(DeviceId(3)),
        "d0 shows up two hops away, beyond the reduced bound"
    );
}

#[test]
fn without_hysteresis_distant_leader_steps_down() {
    let sim = run_election(path_0_5_3(), DiameterBounds::without_hysteresis(6), 10);
    assert_eq!(leader_of(&sim, 3), LeaderRecord::new(DeviceId(0), 2));
}

#[test]
fn leader_survives_oscillating_distant_candidate() {
    let bounds = DiameterBounds::new(6, 2);
    let me = DeviceId(9);
    let mut current = hysteresis_election(me, None, &Field::new(), bounds);
    assert_eq!(current, LeaderRecord::own(me));

    // d1 keeps showing up at distances whose increment lands above the
    // reduced bound but below the diameter bound.
    for announced in [2, 5, 3, 4, 2, 5] {
        let field: Field<LeaderRecord> =
            [(DeviceId(4), LeaderRecord::new(DeviceId(1), announced))].into_iter().collect();
        current = hysteresis_election(me, Some(current), &field, bounds);
        assert_eq!(current, LeaderRecord::own(me), "candidate announced at {announced}");
    }

    // Once it comes within the reduced bound the leader steps down.
    let near: Field<LeaderRecord> =
        [(DeviceId(4), LeaderRecord::new(DeviceId(1), 1))].into_iter().collect();
    current = hysteresis_election(me, Some(current), &near, bounds);
    assert_eq!(current, LeaderRecord::new(DeviceId(1), 2));
}

#[test]
fn election_recovers_after_split() {
    let mut sim = run_election(Topology::line(6), DiameterBounds::without_hysteresis(7), 20);
    assert_eq!(leader_of(&sim, 5).leader, DeviceId(0));

    sim.topology_mut().disconnect(DeviceId(2), DeviceId(3)).unwrap();
    sim.run_steps(30);

    for id in 0..3 {
        assert_eq!(leader_of(&sim, id), LeaderRecord::new(DeviceId(0), id as i32));
    }
    for id in 3..6 {
        assert_eq!(leader_of(&sim, id), LeaderRecord::new(DeviceId(3), id as i32 - 3));
    }
}

// ═══════════════════════════════════════════════════════════════
// Partition-aware election
// ═══════════════════════════════════════════════════════════════

#[test]
fn partitioned_election_stays_inside_outer_partition() {
    // Outer partitions {0, 1, 2} led by d0 and {3, 4, 5} led by d3.
    let outer_of = |id: DeviceId| {
        let leader = if id.as_u32() < 3 { 0 } else { 3 };
        LeaderRecord::new(DeviceId(leader), (id.as_u32() - leader) as i32)
    };
    let program = PartitionedElection::new(DiameterBounds::without_hysteresis(1), outer_of);
    let mut sim = Simulator::new(program, Topology::line(6), SimulatorConfig::default()).unwrap();
    sim.run_steps(10);

    let results: Vec<LeaderRecord> = sim.outputs().map(|(_, r)| *r).collect();
    assert_eq!(
        results,
        vec![
            LeaderRecord::new(DeviceId(0), 0),
            LeaderRecord::new(DeviceId(0), 1),
            LeaderRecord::new(DeviceId(2), 0),
            LeaderRecord::new(DeviceId(3), 0),
            LeaderRecord::new(DeviceId(3), 1),
            LeaderRecord::new(DeviceId(5), 0),
        ]
    );
}

#[test]
fn outer_leader_anchors_inner_level() {
    // d0 leads the outer level; devices within the inner bound of it follow
    // it at their outer distance, the one beyond falls back to itself.
    let outer_of = |id: DeviceId| LeaderRecord::new(DeviceId(0), id.as_u32() as i32);
    let program = PartitionedElection::new(DiameterBounds::without_hysteresis(3), outer_of);
    let mut sim = Simulator::new(program, Topology::line(5), SimulatorConfig::default()).unwrap();
    sim.run_steps(10);

    let results: Vec<LeaderRecord> = sim.outputs().map(|(_, r)| *r).collect();
    assert_eq!(
        results,
        vec![
            LeaderRecord::own(DeviceId(0)),
            LeaderRecord::new(DeviceId(0), 1),
            LeaderRecord::new(DeviceId(0), 2),
            LeaderRecord::new(DeviceId(0), 3),
            LeaderRecord::own(DeviceId(4)),
        ]
    );
}
