//! Configuration loading from TOML and environment variables.
//!
//! The simulator reads its configuration from:
//! 1. A TOML config file given with `--config`
//! 2. Environment variables (override TOML values)
//! 3. Command-line flags (override both, applied by the binary)
//!
//! Environment variable prefix: HIERGOSSIP_

use std::path::Path;

use serde::{Deserialize, Serialize};

use hiergossip_hierarchy::Orientation;
use hiergossip_network::{Schedule, SimulatorConfig};
use hiergossip_protocol::{
    DEFAULT_ASYNC_JITTER, DEFAULT_COMM_RADIUS, DEFAULT_DEVICE_COUNT, DEFAULT_END_TIME,
    DEFAULT_HIERARCHY_BASE, DEFAULT_RETAIN, MAX_DEVICES,
};

use crate::scenario::Variant;
use crate::SimError;

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Deployment and message exchange.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Hierarchy parameters.
    #[serde(default)]
    pub hierarchy: HierarchyOptions,
    /// Round cadence and run length.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// Number of seeds and report destination.
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment and message exchange configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of devices.
    #[serde(default = "default_devices")]
    pub devices: u64,
    /// Communication radius of the unit-disk graph.
    #[serde(default = "default_comm")]
    pub comm: f64,
    /// Deploy in a square instead of a long strip.
    #[serde(default)]
    pub squared: bool,
    /// Seed of the first run.
    #[serde(default)]
    pub seed: u64,
    /// How long a neighbor's export stays visible, in time units.
    #[serde(default = "default_retain")]
    pub retain: f64,
}

/// Hierarchy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyOptions {
    /// Radius growth factor between levels.
    #[serde(default = "default_base")]
    pub base: u32,
    /// Orientation used by single-variant tooling such as `--watch`.
    #[serde(default = "default_orientation")]
    pub orientation: Orientation,
    #[serde(default = "default_true")]
    pub hysteresis: bool,
    /// Variants to run; empty runs all four.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// Round schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub synchronous: bool,
    /// Simulated time at which a run stops.
    #[serde(default = "default_end_time")]
    pub end_time: u64,
    /// Half-width of the asynchronous period distribution around 1.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

/// Scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Move device 0 from one end of the area to the other halfway through.
    #[serde(default = "default_true")]
    pub relocate_leader: bool,
}

/// Batch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of runs, with consecutive seeds.
    #[serde(default = "default_runs")]
    pub runs: u64,
    /// Run every seed under both the synchronous and the asynchronous
    /// schedule instead of only the configured one.
    #[serde(default)]
    pub both_schedules: bool,
    /// Where to write the JSON report; stdout summary only when unset.
    #[serde(default)]
    pub output: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hiergossip_hierarchy=trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

// -- Defaults --

fn default_true() -> bool {
    true
}
fn default_devices() -> u64 {
    DEFAULT_DEVICE_COUNT
}
fn default_comm() -> f64 {
    DEFAULT_COMM_RADIUS
}
fn default_retain() -> f64 {
    DEFAULT_RETAIN
}
fn default_base() -> u32 {
    DEFAULT_HIERARCHY_BASE
}
fn default_orientation() -> Orientation {
    Orientation::BottomUp
}
fn default_end_time() -> u64 {
    DEFAULT_END_TIME
}
fn default_jitter() -> f64 {
    DEFAULT_ASYNC_JITTER
}
fn default_runs() -> u64 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

// -- Trait impls --

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            hierarchy: HierarchyOptions::default(),
            schedule: ScheduleConfig::default(),
            scenario: ScenarioConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            devices: default_devices(),
            comm: default_comm(),
            squared: false,
            seed: 0,
            retain: default_retain(),
        }
    }
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self {
            base: default_base(),
            orientation: default_orientation(),
            hysteresis: true,
            variants: Vec::new(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            synchronous: true,
            end_time: default_end_time(),
            jitter: default_jitter(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            relocate_leader: true,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            both_schedules: false,
            output: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Boolean override value: `true`/`false`, `1`/`0`, `yes`/`no` or
/// `on`/`off`, in any case.
struct Flag(bool);

impl std::str::FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Flag(true)),
            "false" | "0" | "no" | "off" => Ok(Flag(false)),
            _ => Err(()),
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SimError> {
        toml::from_str(content).map_err(|e| SimError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file, with environment variable overrides.
    ///
    /// A missing file falls back to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self, SimError> {
        let mut config = if let Some(path) = path {
            if path.exists() {
                Self::from_file(path)?
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Apply `HIERGOSSIP_*` overrides looked up through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, val: String) -> Option<T> {
            let result = val.trim().parse().ok();
            if result.is_none() {
                tracing::warn!(key, value = %val, "Ignoring unparsable override");
            }
            result
        }

        if let Some(v) = lookup("HIERGOSSIP_DEVICES").and_then(|v| parsed("HIERGOSSIP_DEVICES", v)) {
            self.network.devices = v;
        }
        if let Some(v) = lookup("HIERGOSSIP_BASE").and_then(|v| parsed("HIERGOSSIP_BASE", v)) {
            self.hierarchy.base = v;
        }
        if let Some(v) = lookup("HIERGOSSIP_SEED").and_then(|v| parsed("HIERGOSSIP_SEED", v)) {
            self.network.seed = v;
        }
        if let Some(v) = lookup("HIERGOSSIP_END_TIME").and_then(|v| parsed("HIERGOSSIP_END_TIME", v)) {
            self.schedule.end_time = v;
        }
        if let Some(v) = lookup("HIERGOSSIP_SYNCHRONOUS").and_then(|v| parsed::<Flag>("HIERGOSSIP_SYNCHRONOUS", v)) {
            self.schedule.synchronous = v.0;
        }
        if let Some(val) = lookup("HIERGOSSIP_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Check every value a run depends on.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.network.devices == 0 {
            return Err(SimError::Config("at least one device is required".into()));
        }
        if self.network.devices > MAX_DEVICES {
            return Err(SimError::Config(format!(
                "at most {} devices are supported, got {}",
                MAX_DEVICES, self.network.devices
            )));
        }
        if !(self.network.comm.is_finite() && self.network.comm > 0.0) {
            return Err(SimError::Config(format!(
                "communication radius must be positive, got {}",
                self.network.comm
            )));
        }
        if self.hierarchy.base < 2 {
            return Err(SimError::Config(format!(
                "hierarchy base must be at least 2, got {}",
                self.hierarchy.base
            )));
        }
        if self.batch.runs == 0 {
            return Err(SimError::Config("at least one run is required".into()));
        }
        self.simulator_config(self.network.seed).validate()?;
        Ok(())
    }

    /// Variants to run, all four when none are listed.
    pub fn variants(&self) -> Vec<Variant> {
        if self.hierarchy.variants.is_empty() {
            Variant::ALL.to_vec()
        } else {
            self.hierarchy.variants.clone()
        }
    }

    /// Simulator settings for the run with the given seed.
    pub fn simulator_config(&self, seed: u64) -> SimulatorConfig {
        let schedule = if self.schedule.synchronous {
            Schedule::Synchronous
        } else {
            Schedule::Asynchronous {
                jitter: self.schedule.jitter,
            }
        };
        SimulatorConfig {
            schedule,
            retain: self.network.retain,
            seed,
        }
    }
}
