use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sample representation as reported by the native audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareFormat {
    Unknown,
    U8,   // 8-bit unsigned
    S16,  // 16-bit signed
    S24,  // 24-bit signed, packed into 3 bytes
    S32,  // 32-bit signed
    F32,  // 32-bit float
}

impl HardwareFormat {
    /// Number of hardware format values, including `Unknown`
    pub const COUNT: usize = 6;

    pub const ALL: [HardwareFormat; Self::COUNT] = [
        HardwareFormat::Unknown,
        HardwareFormat::U8,
        HardwareFormat::S16,
        HardwareFormat::S24,
        HardwareFormat::S32,
        HardwareFormat::F32,
    ];

    /// Dense index used by lookup tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Canonical sample representation handed to producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// The hardware settled on something without a canonical equivalent.
    /// Producers should treat this as "reject", never as a numeric default.
    Unknown,
    U8,   // 8-bit unsigned
    I16,  // 16-bit PCM
    I24,  // 24-bit, 3 bytes per sample
    I32,  // 32-bit integer
    F32,  // 32-bit float
}

impl SampleFormat {
    pub const COUNT: usize = 6;

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, SampleFormat::Unknown)
    }
}

/// Format description passed to the producer with every buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Stream parameters the hardware actually granted at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub format: HardwareFormat,
    pub channels: u16,
    pub sample_rate: u32,
    /// Largest period the device may request, if the driver knows it
    pub max_frames: Option<usize>,
}

/// What to ask the hardware for when opening a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRequest {
    /// Let the hardware pick format, channel count and sample rate
    Native,
    /// Request an exact triple
    Exact {
        format: HardwareFormat,
        channels: u16,
        sample_rate: u32,
    },
}

/// Opaque driver-level device identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the form `{prefix}-{index}` for drivers that address devices by
    /// enumeration position
    pub fn indexed(prefix: &str, index: usize) -> Self {
        Self(format!("{}-{}", prefix, index))
    }

    /// Enumeration position encoded by [`DeviceId::indexed`]
    pub fn index(&self, prefix: &str) -> Option<usize> {
        self.0.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback device discovery information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub name: Arc<str>,
    pub is_default: bool,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<DeviceId>, name: impl AsRef<str>, is_default: bool) -> Self {
        Self {
            id: id.into(),
            name: Arc::from(name.as_ref()),
            is_default,
        }
    }
}

/// Mutable view of an interleaved output buffer in its native representation
#[derive(Debug)]
pub enum SampleBufferMut<'a> {
    U8(&'a mut [u8]),
    I16(&'a mut [i16]),
    I24(&'a mut [u8]),  // 3 bytes per sample, little-endian
    I32(&'a mut [i32]),
    F32(&'a mut [f32]),
    Bytes(&'a mut [u8]),  // No typed view available
}

impl<'a> SampleBufferMut<'a> {
    /// Number of samples (not bytes, not frames) in the buffer
    pub fn len(&self) -> usize {
        match self {
            SampleBufferMut::U8(v) => v.len(),
            SampleBufferMut::I16(v) => v.len(),
            SampleBufferMut::I24(v) => v.len() / 3,
            SampleBufferMut::I32(v) => v.len(),
            SampleBufferMut::F32(v) => v.len(),
            SampleBufferMut::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_i16(&mut self) -> Option<&mut [i16]> {
        match self {
            SampleBufferMut::I16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&mut self) -> Option<&mut [f32]> {
        match self {
            SampleBufferMut::F32(v) => Some(v),
            _ => None,
        }
    }
}
