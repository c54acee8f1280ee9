//! Real-time render path.
//!
//! Everything reachable from the closure built here runs on the audio
//! thread: no allocation, no blocking locks, and logging only for the
//! first failure of a stream.

use super::producer::{PlaybackProducer, ProducerSlot};
use crate::error::{OutputError, Result};
use crate::hal::channel_mapper::{needs_shim, DEFAULT_SCRATCH_FRAMES, SHIM_RENDER_CHANNELS};
use crate::hal::{
    AudioFormat, ChannelShim, FormatTable, NegotiatedFormat, RenderFn, SampleBufferMut,
    ShimOutcome,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, trace};

/// Build the render callback for a freshly negotiated stream.
///
/// Scratch storage for the channel shim is allocated here, before the
/// stream starts.
pub(crate) fn build_render(
    slot: ProducerSlot,
    formats: &FormatTable,
    negotiated: NegotiatedFormat,
) -> Result<RenderFn> {
    let mut shim = if needs_shim(negotiated.channels) {
        let frames = negotiated
            .max_frames
            .filter(|&frames| frames > 0)
            .unwrap_or(DEFAULT_SCRATCH_FRAMES);
        debug!(
            hardware_channels = negotiated.channels,
            render_channels = SHIM_RENDER_CHANNELS,
            scratch_frames = frames,
            "channel shim active: slots 0-1 from producer, remaining slots silent"
        );
        Some(ChannelShim::new(negotiated.format, frames)?)
    } else {
        None
    };

    let direct = formats.audio_format(&negotiated, negotiated.channels);
    let shimmed = formats.audio_format(&negotiated, SHIM_RENDER_CHANNELS);
    let mut reported = false;

    Ok(Box::new(move |output: SampleBufferMut<'_>, frames: usize| {
        // stop() holds the lock while it clears the binding
        let Some(mut guard) = slot.try_lock() else {
            return;
        };
        let Some(producer) = guard.as_mut() else {
            return;
        };

        let outcome = match shim.as_mut() {
            None => {
                if invoke(&mut **producer, output, direct, frames) {
                    ShimOutcome::Rendered
                } else {
                    ShimOutcome::NoData
                }
            }
            Some(shim) => shim.render(output, frames, |scratch| {
                invoke(&mut **producer, scratch, shimmed, frames)
            }),
        };

        match outcome {
            ShimOutcome::Rendered | ShimOutcome::NoData => {}
            ShimOutcome::UnsupportedFormat(format) => {
                let err = OutputError::UnsupportedFormat(format);
                if !reported {
                    reported = true;
                    error!(error = %err, "dropping buffer");
                } else {
                    trace!(error = %err, "dropping buffer");
                }
            }
            ShimOutcome::Oversized { frames, capacity } => {
                if !reported {
                    reported = true;
                    error!(frames, capacity, "hardware period exceeds shim scratch, dropping buffer");
                } else {
                    trace!(frames, capacity, "dropping oversized buffer");
                }
            }
        }
    }))
}

/// Call the producer, treating a panic as "no data".
#[inline]
fn invoke(
    producer: &mut dyn PlaybackProducer,
    output: SampleBufferMut<'_>,
    format: AudioFormat,
    frames: usize,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| producer.render(output, format, frames))).unwrap_or(false)
}
