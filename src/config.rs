use crate::error::{OutputError, Result};
use crate::hal::SampleFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How stream parameters are chosen when a device is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NegotiationMode {
    /// Take whatever the hardware prefers and translate it per buffer
    #[default]
    Adaptive,
    /// Always request this exact triple
    Fixed {
        format: SampleFormat,
        channels: u16,
        sample_rate: u32,
    },
}

impl NegotiationMode {
    /// 16-bit stereo at 48 kHz
    pub fn fixed_default() -> Self {
        NegotiationMode::Fixed {
            format: SampleFormat::I16,
            channels: 2,
            sample_rate: 48000,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: NegotiationMode,
    /// Display name of the device to open instead of the system default
    pub device: Option<String>,
}

impl OutputConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| OutputError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            OutputError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| OutputError::InvalidConfig(e.to_string()))
    }

    pub fn with_mode(mut self, mode: NegotiationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }
}
