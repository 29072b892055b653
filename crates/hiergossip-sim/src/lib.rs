//! HierGossip Sim - experiment runner for hierarchical collection
//!
//! Drives the counting instantiation of the hierarchical collection over
//! randomly deployed unit-disk networks:
//! - Configuration from TOML, environment and command line
//! - Deployment in a strip or a square, with optional leader relocation
//! - Side-by-side runs of the bottom-up/top-down and hysteresis variants
//! - Concurrent batches over consecutive seeds with a JSON report

pub mod batch;
pub mod config;
pub mod deployment;
pub mod scenario;

pub use batch::{run_batch, BatchReport};
pub use config::SimConfig;
pub use deployment::{discrete_sqrt, Area, Deployment};
pub use scenario::{RoundSummary, RunReport, Scenario, ScheduleKind, Variant};

use hiergossip_hierarchy::HierarchyError;
use hiergossip_network::NetworkError;
use thiserror::Error;

/// Errors originating from the simulation runner.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run task failed: {0}")]
    Join(String),
}
