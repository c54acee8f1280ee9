use crate::error::OutputError;
use super::types::{HardwareFormat, SampleBufferMut};

/// Hardware channel count that cannot be rendered by direct pass-through
pub const SHIM_HARDWARE_CHANNELS: u16 = 4;

/// Channel count the producer renders at while the shim is active
pub const SHIM_RENDER_CHANNELS: u16 = 2;

/// Scratch capacity when the driver cannot report its largest period
pub const DEFAULT_SCRATCH_FRAMES: usize = 8192;

/// Whether buffers for `channels` must go through [`ChannelShim`]
pub fn needs_shim(channels: u16) -> bool {
    channels == SHIM_HARDWARE_CHANNELS
}

/// Copy each 2-channel frame into slots 0 and 1 of a wider frame and write
/// `silence` into the remaining slots. Stops after `frames` frames.
pub fn expand_stereo<T: Copy>(
    stereo: &[T],
    output: &mut [T],
    output_channels: usize,
    frames: usize,
    silence: T,
) {
    let channels = SHIM_RENDER_CHANNELS as usize;
    for (src, dst) in stereo
        .chunks_exact(channels)
        .zip(output.chunks_exact_mut(output_channels))
        .take(frames)
    {
        dst[..channels].copy_from_slice(src);
        dst[channels..].fill(silence);
    }
}

/// Pre-allocated 2-channel render target
#[derive(Debug)]
enum Scratch {
    I16(Vec<i16>),
    F32(Vec<f32>),
    Unsupported(HardwareFormat),
}

/// Result of pushing one hardware buffer through the shim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimOutcome {
    /// Output buffer now holds the up-mixed frames
    Rendered,
    /// Producer had nothing; output untouched
    NoData,
    /// Sample width the shim cannot expand; output untouched
    UnsupportedFormat(HardwareFormat),
    /// Hardware asked for more frames than scratch holds; output untouched
    Oversized { frames: usize, capacity: usize },
}

/// Renders 2-channel audio and up-mixes it into a 4-channel hardware buffer.
///
/// Scratch storage is allocated once for the negotiated format and reused on
/// every buffer, so the audio thread never allocates.
#[derive(Debug)]
pub struct ChannelShim {
    scratch: Scratch,
    capacity_frames: usize,
}

impl ChannelShim {
    pub fn new(format: HardwareFormat, max_frames: usize) -> Result<Self, OutputError> {
        let samples = max_frames
            .checked_mul(SHIM_RENDER_CHANNELS as usize)
            .ok_or(OutputError::Allocation("channel shim scratch buffer"))?;
        let scratch = match format {
            HardwareFormat::S16 => Scratch::I16(zeroed(samples, 0i16)?),
            HardwareFormat::F32 => Scratch::F32(zeroed(samples, 0.0f32)?),
            other => Scratch::Unsupported(other),
        };

        Ok(Self {
            scratch,
            capacity_frames: max_frames,
        })
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Run `produce` against the scratch buffer, then expand into `output`.
    ///
    /// `produce` is not invoked when the outcome is decided up front
    /// (unsupported width, oversized period).
    pub fn render<F>(&mut self, output: SampleBufferMut<'_>, frames: usize, produce: F) -> ShimOutcome
    where
        F: FnOnce(SampleBufferMut<'_>) -> bool,
    {
        if frames > self.capacity_frames {
            return ShimOutcome::Oversized {
                frames,
                capacity: self.capacity_frames,
            };
        }

        let out_channels = SHIM_HARDWARE_CHANNELS as usize;
        let samples = frames * SHIM_RENDER_CHANNELS as usize;

        match (&mut self.scratch, output) {
            (Scratch::I16(scratch), SampleBufferMut::I16(out)) => {
                let stereo = &mut scratch[..samples];
                if !produce(SampleBufferMut::I16(&mut *stereo)) {
                    return ShimOutcome::NoData;
                }
                expand_stereo(stereo, out, out_channels, frames, 0i16);
                ShimOutcome::Rendered
            }
            (Scratch::F32(scratch), SampleBufferMut::F32(out)) => {
                let stereo = &mut scratch[..samples];
                if !produce(SampleBufferMut::F32(&mut *stereo)) {
                    return ShimOutcome::NoData;
                }
                expand_stereo(stereo, out, out_channels, frames, 0.0f32);
                ShimOutcome::Rendered
            }
            (Scratch::Unsupported(format), _) => ShimOutcome::UnsupportedFormat(*format),
            // Hardware buffer type disagrees with the negotiated format
            (Scratch::I16(_), _) => ShimOutcome::UnsupportedFormat(HardwareFormat::Unknown),
            (Scratch::F32(_), _) => ShimOutcome::UnsupportedFormat(HardwareFormat::Unknown),
        }
    }
}

fn zeroed<T: Copy>(len: usize, value: T) -> Result<Vec<T>, OutputError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| OutputError::Allocation("channel shim scratch buffer"))?;
    buffer.resize(len, value);
    Ok(buffer)
}
