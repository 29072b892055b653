//! HierGossip - Core data model for hierarchical gossip collection
//!
//! Defines the values that devices exchange with their neighbors while
//! electing a hierarchy of local leaders and aggregating measurements:
//! - Device identifiers and the promoted identity used while climbing levels
//! - Leader records (candidate leader, hop distance) with lexicographic order
//! - Measurement sets: sorted sparse maps from origin device to value, with
//!   the idempotent merge used by collection

pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use constants::*;
pub use error::*;
pub use identity::*;
pub use types::*;
