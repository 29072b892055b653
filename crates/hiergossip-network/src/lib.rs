//! HierGossip Network - Round-based neighbor-exchange substrate
//!
//! Provides the exchange layer the collection algorithms run on:
//! - Neighbor fields keyed by device, with min/fold/mux reductions
//! - A per-round context exposing the device's previous export and its
//!   neighbors' latest exports
//! - Topologies with link churn (line, grid, random, unit-disk)
//! - A simulator driving a program on every device under synchronous or
//!   asynchronous round schedules, with message retention

pub mod exchange;
pub mod field;
pub mod simulator;
pub mod topology;

pub use exchange::{Program, RoundContext};
pub use field::{mux, Field};
pub use simulator::{Schedule, Simulator, SimulatorConfig};
pub use topology::{Point, Topology};

use hiergossip_protocol::DeviceId;
use thiserror::Error;

/// Errors originating from the network layer.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Device cannot link to itself: {0}")]
    SelfLink(DeviceId),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] hiergossip_protocol::ProtocolError),
}
