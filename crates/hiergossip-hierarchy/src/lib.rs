//! HierGossip Hierarchy - elections, collection and hierarchical aggregation
//!
//! Builds a multi-level hierarchy over a device network and aggregates a
//! value over it:
//! - Level plan: depth `ceil(log_k N)` with geometrically growing radii
//! - Diameter-bounded leader elections, with hysteresis or nested in an
//!   outer partition
//! - Idempotent collection of measurement sets toward each partition leader
//! - Per-level orchestration, bottom-up or top-down, with an observational
//!   level report per device

pub mod collection;
pub mod elections;
pub mod levels;
pub mod orchestrator;
pub mod report;

pub use collection::{idempotent_collection, Collected, ElectedCollection};
pub use elections::{
    hysteresis_election, partitioned_election, HysteresisElection, PartitionedElection,
    PartitionedRecord,
};
pub use levels::{compute_depth, DiameterBounds, LevelPlan};
pub use orchestrator::{
    CountingCollection, HierarchicalCollection, HierarchyConfig, HierarchyExport, HierarchyRound,
    Orientation,
};
pub use report::{hue_of, Appearance, LevelReport, NodeShape};

use hiergossip_protocol::ProtocolError;
use thiserror::Error;

/// Errors originating from the hierarchy layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HierarchyError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
