//! Level plan: hierarchy depth and per-level election bounds.
//!
//! Levels grow geometrically. For a network of N devices and base k:
//! - Depth: `max_level = ceil(log_k(N))`, 0 for a single device
//! - Radius: `rad[0] = 1`, `rad[i] = rad[i-1] * k`
//! - Diameter bound of level i: `rad[i] - 1`
//! - Hysteresis threshold of level i: `(rad[i] + 1) / 3`, or the diameter
//!   bound itself when hysteresis is disabled
//!
//! Level 0 is every device alone; the synthetic level `max_level + 1` is the
//! whole network, led by a sentinel identifier equal to N.

use serde::{Deserialize, Serialize};

use hiergossip_protocol::{
    DeviceId, Hops, LeaderRecord, ProtocolError, HYSTERESIS_DIVISOR, MAX_DEVICES,
};

use crate::HierarchyError;

/// Distance bounds handed to one election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiameterBounds {
    /// Distances at or above this are not trusted.
    pub diameter: Hops,
    /// A device that leads itself only steps down for a winner at most this far.
    pub reduced: Hops,
}

impl DiameterBounds {
    /// `reduced` is capped at `diameter`.
    pub fn new(diameter: Hops, reduced: Hops) -> Self {
        Self {
            diameter,
            reduced: reduced.min(diameter),
        }
    }

    pub fn without_hysteresis(diameter: Hops) -> Self {
        Self::new(diameter, diameter)
    }

    /// Bounds for a level of the given radius.
    pub fn for_radius(radius: Hops, hysteresis: bool) -> Self {
        let diameter = radius.saturating_sub(1);
        if hysteresis {
            Self::new(diameter, radius.saturating_add(1) / HYSTERESIS_DIVISOR)
        } else {
            Self::without_hysteresis(diameter)
        }
    }
}

/// Number of levels needed so that `base^depth >= device_count`.
///
/// Returns 0 for zero or one device.
pub fn compute_depth(device_count: u64, base: u32) -> usize {
    let base = u64::from(base.max(2));
    let mut depth = 0;
    let mut reach = 1u64;
    while reach < device_count {
        reach = reach.saturating_mul(base);
        depth += 1;
    }
    depth
}

/// Radii and bounds of every level for one network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPlan {
    device_count: u64,
    base: u32,
    hysteresis: bool,
    radii: Vec<Hops>,
}

impl LevelPlan {
    pub fn new(device_count: u64, base: u32, hysteresis: bool) -> Result<Self, HierarchyError> {
        if base < 2 {
            return Err(ProtocolError::InvalidBase(base).into());
        }
        if device_count > MAX_DEVICES {
            return Err(ProtocolError::TooManyDevices {
                count: device_count,
                max: MAX_DEVICES,
            }
            .into());
        }

        let max_level = compute_depth(device_count, base);
        let factor = Hops::try_from(base).unwrap_or(Hops::MAX);
        let mut radii: Vec<Hops> = Vec::with_capacity(max_level + 1);
        radii.push(1);
        for i in 1..=max_level {
            radii.push(radii[i - 1].saturating_mul(factor));
        }

        Ok(Self {
            device_count,
            base,
            hysteresis,
            radii,
        })
    }

    pub fn max_level(&self) -> usize {
        self.radii.len() - 1
    }

    pub fn device_count(&self) -> u64 {
        self.device_count
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn hysteresis(&self) -> bool {
        self.hysteresis
    }

    pub fn radii(&self) -> &[Hops] {
        &self.radii
    }

    /// Radius of `level`; levels past the top report the top radius.
    pub fn radius(&self, level: usize) -> Hops {
        self.radii[level.min(self.max_level())]
    }

    pub fn bounds(&self, level: usize) -> DiameterBounds {
        DiameterBounds::for_radius(self.radius(level), self.hysteresis)
    }

    /// The synthetic record standing for the whole network: the sentinel
    /// identifier at the top radius.
    pub fn global_leader(&self) -> LeaderRecord {
        LeaderRecord::new(
            DeviceId::sentinel(self.device_count),
            self.radius(self.max_level()),
        )
    }
}
