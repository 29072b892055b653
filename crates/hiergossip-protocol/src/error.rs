use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid hierarchy base: {0} (must be at least 2)")]
    InvalidBase(u32),

    #[error("Too many devices: {count} exceeds maximum of {max}")]
    TooManyDevices { count: u64, max: u64 },

    #[error("Invalid device identifier: {0}")]
    InvalidIdentifier(String),
}
