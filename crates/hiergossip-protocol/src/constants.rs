use crate::types::Hops;

/// Default hierarchy growth base: each level's radius is this many times
/// the radius of the level below.
pub const DEFAULT_HIERARCHY_BASE: u32 = 2;

/// Default number of devices in a simulated network.
pub const DEFAULT_DEVICE_COUNT: u64 = 100;

/// Default communication radius between devices, in deployment units.
pub const DEFAULT_COMM_RADIUS: f64 = 100.0;

/// Default end of simulated time.
pub const DEFAULT_END_TIME: u64 = 500;

/// Default lifetime of a received neighbor message, in time units.
pub const DEFAULT_RETAIN: f64 = 2.0;

/// Default half-width of the asynchronous round period around 1.0.
pub const DEFAULT_ASYNC_JITTER: f64 = 0.1;

/// The hysteresis threshold of a level of radius `r` is `(r + 1) / HYSTERESIS_DIVISOR`.
pub const HYSTERESIS_DIVISOR: Hops = 3;

/// Largest supported device count. The network-wide sentinel leader uses
/// the device count itself as identifier, so it must fit in a `DeviceId`.
pub const MAX_DEVICES: u64 = u32::MAX as u64;

/// Number of distinct node shapes cycled through by hierarchy level.
pub const NODE_SHAPES: usize = 6;

/// Node size of a level-0 device; every level adds `NODE_SIZE_STEP`.
pub const BASE_NODE_SIZE: f64 = 5.0;

/// Node size increment per hierarchy level.
pub const NODE_SIZE_STEP: f64 = 2.0;

/// Full hue circle in degrees.
pub const FULL_HUE: f32 = 360.0;
