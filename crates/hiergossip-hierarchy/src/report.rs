//! Observational output of a hierarchy round.
//!
//! Nothing here feeds back into the algorithm: these are projections of the
//! leader and count chains for logging and visualization consumers.

use serde::{Deserialize, Serialize};

use hiergossip_protocol::{
    DeviceId, Hops, LeaderRecord, MeasurementSet, BASE_NODE_SIZE, FULL_HUE, NODE_SHAPES,
    NODE_SIZE_STEP,
};

/// Shape used to draw a device, cycling with its hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Tetrahedron,
    Cube,
    Octahedron,
    Icosahedron,
    Sphere,
    Star,
}

impl NodeShape {
    pub fn for_level(level: usize) -> Self {
        match level % NODE_SHAPES {
            0 => NodeShape::Tetrahedron,
            1 => NodeShape::Cube,
            2 => NodeShape::Octahedron,
            3 => NodeShape::Icosahedron,
            4 => NodeShape::Sphere,
            _ => NodeShape::Star,
        }
    }
}

/// Hue in degrees assigned to a device identifier. The sentinel identifier
/// and anything above it share the last hue.
pub fn hue_of(id: DeviceId, device_count: u64) -> f32 {
    if device_count == 0 {
        return 0.0;
    }
    let clamped = u64::from(id.as_u32()).min(device_count);
    clamped as f32 * FULL_HUE / device_count as f32
}

/// Visual attributes of a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Hue of the immediate leader.
    pub leader_hue: f32,
    /// Hue of the device itself.
    pub personal_hue: f32,
    pub size: f64,
    pub shape: NodeShape,
}

impl Appearance {
    pub fn new(uid: DeviceId, level: usize, leader: DeviceId, device_count: u64) -> Self {
        Self {
            leader_hue: hue_of(leader, device_count),
            personal_hue: hue_of(uid, device_count),
            size: BASE_NODE_SIZE + NODE_SIZE_STEP * level as f64,
            shape: NodeShape::for_level(level),
        }
    }
}

/// Where a device sits in the hierarchy after a round, plus the chains it
/// computed on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport<T> {
    /// Highest level this device leads (0 if it leads nothing but itself).
    pub level: usize,
    /// Leader of the partition one level above `level`.
    pub leader: DeviceId,
    /// Hop distance to `leader`.
    pub leader_distance: Hops,
    pub appearance: Appearance,
    /// Leader record per level, including the trivial level 0 and the
    /// network-wide sentinel.
    pub leader_chain: Vec<LeaderRecord>,
    /// Collected set per level before accumulation, level 0 included.
    pub count_chain: Vec<MeasurementSet<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_scale() {
        assert_eq!(hue_of(DeviceId(0), 100), 0.0);
        assert_eq!(hue_of(DeviceId(50), 100), 180.0);
        assert_eq!(hue_of(DeviceId(100), 100), 360.0);
        assert_eq!(hue_of(DeviceId(500), 100), 360.0);
        assert_eq!(hue_of(DeviceId(3), 0), 0.0);
    }

    #[test]
    fn test_shape_cycles() {
        assert_eq!(NodeShape::for_level(0), NodeShape::Tetrahedron);
        assert_eq!(NodeShape::for_level(5), NodeShape::Star);
        assert_eq!(NodeShape::for_level(6), NodeShape::Tetrahedron);
    }

    #[test]
    fn test_appearance_size_grows_with_level() {
        let a = Appearance::new(DeviceId(1), 3, DeviceId(0), 10);
        assert_eq!(a.size, 11.0);
        assert_eq!(a.shape, NodeShape::Icosahedron);
        assert_eq!(a.leader_hue, 0.0);
        assert_eq!(a.personal_hue, 36.0);
    }
}
