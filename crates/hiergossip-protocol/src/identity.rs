use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::MAX_DEVICES;

/// Unique identifier for a device in the network.
///
/// Identifiers are totally ordered and that order is the only tie-break
/// used by leader elections: the smallest identifier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_index(self) -> usize {
        self.0 as usize
    }

    /// Identifier of the synthetic network-wide leader for a network of
    /// `device_count` devices numbered `0..device_count`.
    pub fn sentinel(device_count: u64) -> Self {
        Self(device_count.min(MAX_DEVICES) as u32)
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ProtocolError;

    /// Accepts both the bare number (`"12"`) and the display form (`"d12"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix('d').unwrap_or(s.trim());
        digits
            .parse::<u32>()
            .map(DeviceId)
            .map_err(|_| ProtocolError::InvalidIdentifier(s.to_string()))
    }
}

/// A device's identity while it climbs the hierarchy.
///
/// Once a device has been absorbed under a higher-level leader it is
/// *promoted*: it keeps its raw identifier but no longer counts as itself
/// for any further level. This replaces packing a reserved high bit into
/// the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    raw: DeviceId,
    promoted: bool,
}

impl Identity {
    pub fn new(raw: DeviceId) -> Self {
        Self {
            raw,
            promoted: false,
        }
    }

    pub fn raw(&self) -> DeviceId {
        self.raw
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    /// Mark the identity as promoted. Returns `true` if this call changed it.
    pub fn promote(&mut self) -> bool {
        !std::mem::replace(&mut self.promoted, true)
    }

    /// Whether this identity still stands for `id` in its own right.
    /// A promoted identity never equals any real identifier.
    pub fn is(&self, id: DeviceId) -> bool {
        !self.promoted && self.raw == id
    }
}
