use crate::hal::{AudioFormat, SampleBufferMut};
use parking_lot::Mutex;
use std::sync::Arc;

/// Application-side source of PCM samples.
///
/// Called from the audio thread once per hardware buffer with an interleaved
/// buffer in the representation described by `format`. Return `false` when
/// there is nothing to play; the bridge then leaves the hardware buffer as
/// it was.
pub trait PlaybackProducer: Send + 'static {
    fn render(&mut self, output: SampleBufferMut<'_>, format: AudioFormat, frames: usize) -> bool;
}

impl<F> PlaybackProducer for F
where
    F: FnMut(SampleBufferMut<'_>, AudioFormat, usize) -> bool + Send + 'static,
{
    fn render(&mut self, output: SampleBufferMut<'_>, format: AudioFormat, frames: usize) -> bool {
        self(output, format, frames)
    }
}

/// Pin a closure to the producer signature so its buffer lifetime is inferred
/// as higher-ranked.
pub fn from_fn<F>(f: F) -> F
where
    F: FnMut(SampleBufferMut<'_>, AudioFormat, usize) -> bool + Send + 'static,
{
    f
}

/// Producer binding shared between the session and the render callback.
/// `None` while no stream is active.
pub(crate) type ProducerSlot = Arc<Mutex<Option<Box<dyn PlaybackProducer>>>>;
