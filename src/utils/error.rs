//! Error types for zai

use thiserror::Error;

/// Errors raised by the layout planner core (sizes, planner, emitter).
///
/// The core never logs or retries; every failure is handed back to the
/// caller through one of these variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Partition spans from {from_mib} -> {to_mib}MiB but device size is {device_mb}MB")]
    OutOfSpace {
        from_mib: u64,
        to_mib: u64,
        device_mb: f64,
    },

    #[error("Invalid remainder percentage: {0}% (expected 1-100 and past the last partition start)")]
    InvalidPercentage(u8),

    #[error("Invalid planner state: {0}")]
    InvalidState(&'static str),

    #[error("Cannot emit an empty partition layout")]
    EmptyLayout,
}

#[derive(Error, Debug)]
pub enum ZaiError {
    #[error("Must be run as root")]
    NotRoot,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device size query failed for {device}: {reason}")]
    DeviceQueryFailed { device: String, reason: String },

    #[error("Device is not a block device: {0}")]
    NotBlockDevice(String),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error("Partition error: {0}")]
    PartitionError(String),

    #[error("Command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ZaiError>;
