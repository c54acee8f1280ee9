use super::directory::{DeviceDirectory, OutputTargets};
use super::producer::{PlaybackProducer, ProducerSlot};
use super::render::build_render;
use crate::config::{NegotiationMode, OutputConfig};
use crate::error::{OutputError, Result};
use crate::hal::{
    Device, DeviceDescriptor, HardwareDriver, HardwareFormat, NegotiatedFormat, StreamRequest,
};
use crate::plugin::InitContext;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lifecycle state of an [`OutputSession`].
///
/// There is no destroyed state: [`OutputSession::destroy`] consumes the
/// session, so nothing can be called on it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Devices enumerated, nothing open
    Created,
    /// Device open and delivering buffers to the producer
    Active,
    /// Stream halted; the device handle is kept until the next start
    Stopped,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Created => "Created",
            SessionState::Active => "Active",
            SessionState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One playback stream's worth of state: cached devices, the open device
/// handle and the producer binding.
///
/// `start`, `stop` and `destroy` take `&mut self`/`self`, so state
/// transitions are never concurrent with each other.
pub struct OutputSession {
    context: Arc<InitContext>,
    driver: Arc<dyn HardwareDriver>,
    directory: DeviceDirectory,
    config: OutputConfig,
    device: Option<Box<dyn Device>>,
    producer: ProducerSlot,
    state: SessionState,
}

impl OutputSession {
    /// Enumerate devices and build a session in the Created state
    pub fn create(
        context: Arc<InitContext>,
        driver: Arc<dyn HardwareDriver>,
        config: OutputConfig,
    ) -> Result<Self> {
        let directory = DeviceDirectory::enumerate(driver.as_ref()).map_err(|e| {
            error!(driver = driver.driver_id(), error = %e, "session creation failed");
            e
        })?;

        debug!(
            driver = driver.driver_id(),
            devices = directory.len(),
            default = ?directory.default_index(),
            "playback devices enumerated"
        );

        Ok(Self {
            context,
            driver,
            directory,
            config,
            device: None,
            producer: Arc::new(Mutex::new(None)),
            state: SessionState::Created,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    pub fn targets(&self) -> OutputTargets<'_> {
        self.directory.targets()
    }

    /// Parameters of the currently held device, if any
    pub fn negotiated(&self) -> Option<NegotiatedFormat> {
        self.device.as_ref().map(|d| d.negotiated())
    }

    pub fn is_streaming(&self) -> bool {
        self.device.as_ref().map(|d| d.is_streaming()).unwrap_or(false)
    }

    /// Open the selected device and begin delivering buffers to `producer`.
    ///
    /// From Stopped the previous handle is released and the device is opened
    /// again, renegotiating the stream. On failure the session is left in
    /// Created with no device held, ready for another attempt.
    pub fn start<P: PlaybackProducer>(&mut self, producer: P) -> Result<()> {
        if self.state == SessionState::Active {
            warn!("start called on an active session, restarting");
            self.stop()?;
        }

        self.device = None;
        self.state = SessionState::Created;

        let descriptor = self.select_device()?.clone();
        let request = self.stream_request()?;

        let mut device = self.driver.open_device(&descriptor, &request).map_err(|e| {
            let err = OutputError::device_open(&e);
            error!(device = %descriptor.name, error = %err, "unable to create device");
            err
        })?;

        let negotiated = device.negotiated();
        debug!(
            device = %descriptor.name,
            format = ?negotiated.format,
            channels = negotiated.channels,
            sample_rate = negotiated.sample_rate,
            max_frames = ?negotiated.max_frames,
            "device opened"
        );
        if negotiated.format == HardwareFormat::Unknown {
            warn!(device = %descriptor.name, "hardware format has no canonical equivalent");
        }

        let render = build_render(self.producer.clone(), self.context.formats(), negotiated)?;
        *self.producer.lock() = Some(Box::new(producer));

        if let Err(e) = device.start(render) {
            self.producer.lock().take();
            let err = OutputError::device_open(&e);
            error!(device = %descriptor.name, error = %err, "unable to start device");
            return Err(err);
        }

        info!(device = %descriptor.name, driver = self.driver.driver_id(), "playback device started");
        self.device = Some(device);
        self.state = SessionState::Active;
        Ok(())
    }

    /// Halt the stream. Once this returns the producer will not be called
    /// again until the next `start`.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Active {
            debug!(state = %self.state, "stop ignored");
            return Ok(());
        }

        // Waits out any buffer the audio thread is rendering right now
        self.producer.lock().take();

        let result = match self.device.as_mut() {
            Some(device) => device.stop(),
            None => Ok(()),
        };
        self.state = SessionState::Stopped;

        result.map_err(|e| {
            let err = OutputError::device_stop(&e);
            error!(error = %err, "unable to stop device");
            err
        })
    }

    /// Stop if needed and release everything the session holds
    pub fn destroy(mut self) -> Result<()> {
        let result = self.stop();
        self.device = None;
        debug!(devices = self.directory.len(), "session destroyed");
        result
    }

    fn select_device(&self) -> Result<&DeviceDescriptor> {
        if self.directory.is_empty() {
            return Err(OutputError::DeviceOpen("no playback devices available".to_string()));
        }

        if let Some(name) = self.config.device.as_deref() {
            match self.directory.find_by_name(name) {
                Some(index) => return self.descriptor_at(index),
                None => warn!(device = name, "configured device not found, using default"),
            }
        }

        let index = self.directory.default_index().unwrap_or_else(|| {
            debug!("no device reports default, using first");
            0
        });
        self.descriptor_at(index)
    }

    fn descriptor_at(&self, index: usize) -> Result<&DeviceDescriptor> {
        self.directory
            .get(index)
            .ok_or_else(|| OutputError::DeviceOpen(format!("device index {} out of range", index)))
    }

    fn stream_request(&self) -> Result<StreamRequest> {
        match self.config.mode {
            NegotiationMode::Adaptive => Ok(StreamRequest::Native),
            NegotiationMode::Fixed {
                format,
                channels,
                sample_rate,
            } => {
                let hardware = self.context.formats().canonical_to_hardware(format);
                if hardware == HardwareFormat::Unknown {
                    return Err(OutputError::InvalidConfig(format!(
                        "fixed mode needs a concrete sample format, got {:?}",
                        format
                    )));
                }
                Ok(StreamRequest::Exact {
                    format: hardware,
                    channels,
                    sample_rate,
                })
            }
        }
    }
}

impl Drop for OutputSession {
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for OutputSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSession")
            .field("driver", &self.driver.driver_id())
            .field("state", &self.state)
            .field("devices", &self.directory.len())
            .field("negotiated", &self.negotiated())
            .finish()
    }
}
