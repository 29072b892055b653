//! Tests for single-level idempotent collection.
//!
//! Verifies:
//! - Every device's entry reaches its partition leader exactly once
//! - Multi-path topologies do not duplicate entries
//! - Followers only hold what flows through them from farther devices

use hiergossip_hierarchy::collection::{Collected, ElectedCollection};
use hiergossip_hierarchy::levels::DiameterBounds;
use hiergossip_network::{Simulator, SimulatorConfig, Topology};
use hiergossip_protocol::{DeviceId, MeasurementSet};

type SetCollection = ElectedCollection<
    MeasurementSet<u64>,
    fn(MeasurementSet<u64>, MeasurementSet<u64>) -> MeasurementSet<u64>,
    fn(DeviceId) -> MeasurementSet<u64>,
>;

fn own_entry(id: DeviceId) -> MeasurementSet<u64> {
    MeasurementSet::singleton(id, u64::from(id.as_u32()) * 10)
}

fn collect_sets(topology: Topology, bounds: DiameterBounds, steps: u64) -> Simulator<SetCollection> {
    let program: SetCollection = ElectedCollection::new(
        bounds,
        MeasurementSet::new(),
        MeasurementSet::merge as fn(_, _) -> _,
        own_entry as fn(_) -> _,
    );
    let mut sim = Simulator::new(program, topology, SimulatorConfig::default()).unwrap();
    sim.run_steps(steps);
    sim
}

fn collected(sim: &Simulator<SetCollection>, id: u32) -> &Collected<MeasurementSet<u64>> {
    sim.output(DeviceId(id)).expect("device has run")
}

// ═══════════════════════════════════════════════════════════════
// Collection toward a single leader
// ═══════════════════════════════════════════════════════════════

#[test]
fn leader_collects_every_entry_on_a_line() {
    let sim = collect_sets(Topology::line(5), DiameterBounds::without_hysteresis(10), 20);
    let at_leader = collected(&sim, 0);
    assert_eq!(at_leader.leader.leader, DeviceId(0));
    assert_eq!(at_leader.value.origins().collect::<Vec<_>>(), (0..5).map(DeviceId).collect::<Vec<_>>());
    assert_eq!(at_leader.value.get(DeviceId(4)), Some(&40));
}

#[test]
fn followers_hold_only_the_far_side() {
    let sim = collect_sets(Topology::line(5), DiameterBounds::without_hysteresis(10), 20);
    let middle = &collected(&sim, 2).value;
    assert_eq!(middle.origins().collect::<Vec<_>>(), vec![DeviceId(2), DeviceId(3), DeviceId(4)]);
    assert_eq!(collected(&sim, 4).value.len(), 1);
}

#[test]
fn grid_multipath_counts_each_origin_once() {
    let sim = collect_sets(Topology::grid(4, 4), DiameterBounds::without_hysteresis(10), 30);
    let at_leader = &collected(&sim, 0).value;
    assert_eq!(at_leader.len(), 16);
    let total: u64 = at_leader.iter().map(|e| e.value).sum();
    assert_eq!(total, (0..16).map(|i| i * 10).sum::<u64>());
}

// ═══════════════════════════════════════════════════════════════
// Partitions
// ═══════════════════════════════════════════════════════════════

#[test]
fn partitions_collect_separately() {
    // Diameter 1 splits the line into {0, 1} and {2, 3}.
    let sim = collect_sets(Topology::line(4), DiameterBounds::new(1, 1), 20);
    assert_eq!(
        collected(&sim, 0).value.origins().collect::<Vec<_>>(),
        vec![DeviceId(0), DeviceId(1)]
    );
    assert_eq!(
        collected(&sim, 2).value.origins().collect::<Vec<_>>(),
        vec![DeviceId(2), DeviceId(3)]
    );
}

#[test]
fn split_network_forgets_lost_side() {
    let mut sim = collect_sets(Topology::line(6), DiameterBounds::without_hysteresis(7), 20);
    assert_eq!(collected(&sim, 0).value.len(), 6);

    sim.topology_mut().disconnect(DeviceId(2), DeviceId(3)).unwrap();
    sim.run_steps(40);

    assert_eq!(collected(&sim, 0).value.len(), 3);
    assert_eq!(collected(&sim, 3).leader.leader, DeviceId(3));
    assert_eq!(
        collected(&sim, 3).value.origins().collect::<Vec<_>>(),
        vec![DeviceId(3), DeviceId(4), DeviceId(5)]
    );
}
