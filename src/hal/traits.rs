use anyhow::Result;
use super::types::{DeviceDescriptor, NegotiatedFormat, SampleBufferMut, StreamRequest};

/// Render callback handed to a device; invoked once per buffer-ready event
/// with the hardware buffer and its frame count.
pub type RenderFn = Box<dyn FnMut(SampleBufferMut<'_>, usize) + Send + 'static>;

/// Trait implemented by native audio layers for device discovery and opening
pub trait HardwareDriver: Send + Sync {
    /// Unique driver identifier (e.g., "cpal")
    fn driver_id(&self) -> &str;

    /// Version of the underlying audio library this driver was built against
    fn subsystem_version(&self) -> &str;

    /// Enumerate playback devices
    fn discover_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open a playback device, negotiating parameters per `request`
    fn open_device(
        &self,
        device: &DeviceDescriptor,
        request: &StreamRequest,
    ) -> Result<Box<dyn Device>>;
}

/// Trait implemented by opened playback devices
pub trait Device: Send {
    /// Parameters granted by the hardware at open time
    fn negotiated(&self) -> NegotiatedFormat;

    /// Begin invoking `render` from the audio thread
    fn start(&mut self, render: RenderFn) -> Result<()>;

    /// Halt the stream. No `render` invocation may be in flight once this returns.
    fn stop(&mut self) -> Result<()>;

    /// Check if device is currently streaming
    fn is_streaming(&self) -> bool;
}
