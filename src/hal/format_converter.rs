use super::types::{AudioFormat, HardwareFormat, NegotiatedFormat, SampleFormat};

/// Lookup between hardware-native and canonical sample representations.
///
/// Built once during plugin initialization and shared read-only by every
/// session. Both directions are total: every hardware value has a canonical
/// entry and vice versa, with `Unknown` mapping to `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTable {
    to_canonical: [SampleFormat; HardwareFormat::COUNT],
    to_hardware: [HardwareFormat; SampleFormat::COUNT],
}

impl FormatTable {
    /// Build the table. Rebuilding yields an identical table.
    pub fn build() -> Self {
        let mut to_canonical = [SampleFormat::Unknown; HardwareFormat::COUNT];
        let mut to_hardware = [HardwareFormat::Unknown; SampleFormat::COUNT];

        for hw in HardwareFormat::ALL {
            let canonical = match hw {
                HardwareFormat::Unknown => SampleFormat::Unknown,
                HardwareFormat::U8 => SampleFormat::U8,
                HardwareFormat::S16 => SampleFormat::I16,
                HardwareFormat::S24 => SampleFormat::I24,
                HardwareFormat::S32 => SampleFormat::I32,
                HardwareFormat::F32 => SampleFormat::F32,
            };
            to_canonical[hw.index()] = canonical;
            to_hardware[canonical.index()] = hw;
        }

        Self {
            to_canonical,
            to_hardware,
        }
    }

    #[inline]
    pub fn hardware_to_canonical(&self, format: HardwareFormat) -> SampleFormat {
        self.to_canonical[format.index()]
    }

    #[inline]
    pub fn canonical_to_hardware(&self, format: SampleFormat) -> HardwareFormat {
        self.to_hardware[format.index()]
    }

    /// Producer-facing format for a negotiated stream rendered at `channels`
    #[inline]
    pub fn audio_format(&self, negotiated: &NegotiatedFormat, channels: u16) -> AudioFormat {
        AudioFormat {
            format: self.hardware_to_canonical(negotiated.format),
            channels,
            sample_rate: negotiated.sample_rate,
        }
    }
}

impl Default for FormatTable {
    fn default() -> Self {
        Self::build()
    }
}
