use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::{debug, trace};
use crate::hal::traits::HardwareDriver;
use crate::hal::types::*;
use crate::hal::Device;
use super::audio_device::AudioDevice;

/// Largest period we report to the session; backends sometimes advertise
/// ranges far beyond anything they actually request.
const MAX_REPORTED_FRAMES: u32 = 1 << 16;

const ID_PREFIX: &str = "output";

/// Playback driver over the host's default cpal backend
pub struct AudioDriver;

impl AudioDriver {
    pub fn new() -> Self {
        Self
    }
}

impl HardwareDriver for AudioDriver {
    fn driver_id(&self) -> &str {
        "cpal-audio"
    }

    fn subsystem_version(&self) -> &str {
        "0.15"
    }

    fn discover_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let host = cpal::default_host();
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let mut devices: Vec<DeviceDescriptor> = Vec::new();
        let outputs = host
            .output_devices()
            .context("Failed to query output devices")?;

        for (idx, device) in outputs.enumerate() {
            match device.name() {
                Ok(name) => {
                    // cpal exposes no device identity beyond the name, so only
                    // the first output carrying the default's name is flagged
                    let named_default = default_name.as_deref() == Some(name.as_str());
                    let is_default = named_default && !devices.iter().any(|d| d.is_default);
                    if named_default && !is_default {
                        debug!(index = idx, device = %name, "default device name is ambiguous");
                    }
                    devices.push(DeviceDescriptor::new(
                        DeviceId::indexed(ID_PREFIX, idx),
                        name,
                        is_default,
                    ));
                }
                Err(e) => debug!(index = idx, error = %e, "skipping output device without a name"),
            }
        }

        Ok(devices)
    }

    fn open_device(
        &self,
        device: &DeviceDescriptor,
        request: &StreamRequest,
    ) -> Result<Box<dyn Device>> {
        let index = device
            .id
            .index(ID_PREFIX)
            .ok_or_else(|| anyhow!("{} is not a cpal output id", device.id))?;
        let cpal_device = output_at(index, &device.name)?;

        let supported = match *request {
            StreamRequest::Native => cpal_device
                .default_output_config()
                .context("Failed to query default output config")?,
            StreamRequest::Exact {
                format,
                channels,
                sample_rate,
            } => {
                let wanted = to_cpal_format(format)
                    .ok_or_else(|| anyhow!("cpal cannot represent {:?}", format))?;
                let mut ranges = cpal_device
                    .supported_output_configs()
                    .context("Failed to query supported output configs")?;
                ranges
                    .find(|r| {
                        r.channels() == channels
                            && r.sample_format() == wanted
                            && r.min_sample_rate().0 <= sample_rate
                            && sample_rate <= r.max_sample_rate().0
                    })
                    .map(|r| r.with_sample_rate(cpal::SampleRate(sample_rate)))
                    .ok_or_else(|| {
                        anyhow!(
                            "{} does not support {:?}/{}ch/{}Hz",
                            device.name,
                            format,
                            channels,
                            sample_rate
                        )
                    })?
            }
        };

        let max_frames = match supported.buffer_size() {
            cpal::SupportedBufferSize::Range { max, .. } => {
                Some((*max).min(MAX_REPORTED_FRAMES) as usize)
            }
            cpal::SupportedBufferSize::Unknown => None,
        };

        let negotiated = NegotiatedFormat {
            format: from_cpal_format(supported.sample_format()),
            channels: supported.channels(),
            sample_rate: supported.sample_rate().0,
            max_frames,
        };

        if negotiated.channels == 0 {
            bail!("{} reported zero output channels", device.name);
        }

        trace!(device = %device.name, cpal_format = ?supported.sample_format(), "resolved cpal config");

        Ok(Box::new(AudioDevice::new(
            index,
            device.name.to_string(),
            supported.config(),
            supported.sample_format(),
            negotiated,
        )))
    }
}

impl Default for AudioDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Output device at enumeration position `index` on the default host.
/// Fails if the device there no longer carries `name`.
pub(crate) fn output_at(index: usize, name: &str) -> Result<cpal::Device> {
    let host = cpal::default_host();
    let device = host
        .output_devices()
        .context("Failed to query output devices")?
        .nth(index)
        .ok_or_else(|| anyhow!("Output device {:?} is no longer available", name))?;

    let current = device.name().context("Failed to read output device name")?;
    if current != name {
        bail!("Output list changed: expected {:?} at index {}, found {:?}", name, index, current);
    }
    Ok(device)
}

pub(crate) fn from_cpal_format(format: cpal::SampleFormat) -> HardwareFormat {
    match format {
        cpal::SampleFormat::U8 => HardwareFormat::U8,
        cpal::SampleFormat::I16 => HardwareFormat::S16,
        cpal::SampleFormat::I32 => HardwareFormat::S32,
        cpal::SampleFormat::F32 => HardwareFormat::F32,
        _ => HardwareFormat::Unknown,
    }
}

pub(crate) fn to_cpal_format(format: HardwareFormat) -> Option<cpal::SampleFormat> {
    match format {
        HardwareFormat::U8 => Some(cpal::SampleFormat::U8),
        HardwareFormat::S16 => Some(cpal::SampleFormat::I16),
        HardwareFormat::S32 => Some(cpal::SampleFormat::I32),
        HardwareFormat::F32 => Some(cpal::SampleFormat::F32),
        // cpal 0.15 has no packed 24-bit representation
        HardwareFormat::S24 | HardwareFormat::Unknown => None,
    }
}
