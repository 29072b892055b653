//! Random deployment of devices in a rectangular area.
//!
//! Two area shapes:
//! - Strip: `devices * 10` wide and `comm` tall, so hop distances grow
//!   roughly linearly with the device count.
//! - Square: side `discrete_sqrt(devices * 3000)`, the same average density
//!   spread over a compact area.
//!
//! Devices are linked when they are within `comm` of each other.

use rand::Rng;
use serde::{Deserialize, Serialize};

use hiergossip_network::{Point, Topology};
use hiergossip_protocol::DeviceId;

/// Area per device in both shapes.
const AREA_PER_DEVICE: u64 = 3000;
const STRIP_SPACING: f64 = 10.0;

/// Smallest integer whose square is at least `n`.
pub fn discrete_sqrt(n: u64) -> u64 {
    let (mut lo, mut hi) = (0u64, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if mid.checked_mul(mid).is_some_and(|sq| sq < n) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Dimensions of the deployment area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub xside: f64,
    pub yside: f64,
}

impl Area {
    pub fn new(devices: u64, comm: f64, squared: bool) -> Self {
        if squared {
            let side = discrete_sqrt(devices.saturating_mul(AREA_PER_DEVICE)) as f64;
            Self {
                xside: side,
                yside: side,
            }
        } else {
            Self {
                xside: devices as f64 * STRIP_SPACING,
                yside: comm,
            }
        }
    }

    /// Middle of the left edge.
    pub fn left_end(&self) -> Point {
        Point::new(0.0, self.yside / 2.0)
    }

    /// Middle of the right edge.
    pub fn right_end(&self) -> Point {
        Point::new(self.xside, self.yside / 2.0)
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(rng.gen::<f64>() * self.xside, rng.gen::<f64>() * self.yside)
    }
}

/// Device positions, indexed by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    area: Area,
    comm: f64,
    positions: Vec<Point>,
}

impl Deployment {
    /// Place `devices` devices uniformly at random.
    pub fn random<R: Rng + ?Sized>(devices: u32, area: Area, comm: f64, rng: &mut R) -> Self {
        let positions = (0..devices).map(|_| area.random_point(rng)).collect();
        Self {
            area,
            comm,
            positions,
        }
    }

    pub fn from_positions(positions: Vec<Point>, area: Area, comm: f64) -> Self {
        Self {
            area,
            comm,
            positions,
        }
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn comm(&self) -> f64 {
        self.comm
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn position(&self, id: DeviceId) -> Option<Point> {
        self.positions.get(id.as_index()).copied()
    }

    pub fn topology(&self) -> Topology {
        Topology::unit_disk(&self.positions, self.comm)
    }

    /// Move a device, returning `false` if it is unknown.
    pub fn move_device(&mut self, id: DeviceId, to: Point) -> bool {
        match self.positions.get_mut(id.as_index()) {
            Some(p) => {
                *p = to;
                true
            }
            None => false,
        }
    }
}
