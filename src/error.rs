//! Error types for the playback bridge.

use crate::hal::HardwareFormat;
use thiserror::Error;

/// Error type for bridge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("Unable to allocate memory for {0}")]
    Allocation(&'static str),

    #[error("Unable to enumerate playback devices: {0}")]
    Enumeration(String),

    #[error("Unable to open playback device: {0}")]
    DeviceOpen(String),

    #[error("Unable to stop playback device: {0}")]
    DeviceStop(String),

    #[error("Unsupported sample format for channel shim: {0:?}")]
    UnsupportedFormat(HardwareFormat),

    #[error("Format table not initialized; call static_init first")]
    NotInitialized,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, OutputError>;

impl OutputError {
    /// Render an `anyhow` chain into a device-open error
    pub(crate) fn device_open(err: &anyhow::Error) -> Self {
        OutputError::DeviceOpen(format!("{err:#}"))
    }

    pub(crate) fn device_stop(err: &anyhow::Error) -> Self {
        OutputError::DeviceStop(format!("{err:#}"))
    }

    pub(crate) fn enumeration(err: &anyhow::Error) -> Self {
        OutputError::Enumeration(format!("{err:#}"))
    }
}
