use crate::hal::{
    Device, DeviceDescriptor, DeviceId, HardwareDriver, HardwareFormat, NegotiatedFormat, RenderFn,
    SampleBufferMut, StreamRequest,
};
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const TICK_TIMEOUT: Duration = Duration::from_secs(2);
const ID_PREFIX: &str = "sim";

/// Owned hardware buffer used by the simulated device
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedBuffer {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I24(Vec<u8>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl SimulatedBuffer {
    /// Buffer of `frames * channels` samples, every sample set to `fill`
    pub fn filled(format: HardwareFormat, frames: usize, channels: u16, fill: i32) -> Self {
        let len = frames * channels as usize;
        match format {
            HardwareFormat::U8 => SimulatedBuffer::U8(vec![fill as u8; len]),
            HardwareFormat::S16 => SimulatedBuffer::I16(vec![fill as i16; len]),
            HardwareFormat::S24 => SimulatedBuffer::I24(vec![fill as u8; len * 3]),
            HardwareFormat::S32 => SimulatedBuffer::I32(vec![fill; len]),
            HardwareFormat::F32 | HardwareFormat::Unknown => {
                SimulatedBuffer::F32(vec![fill as f32; len])
            }
        }
    }

    pub fn view(&mut self) -> SampleBufferMut<'_> {
        match self {
            SimulatedBuffer::U8(v) => SampleBufferMut::U8(v),
            SimulatedBuffer::I16(v) => SampleBufferMut::I16(v),
            SimulatedBuffer::I24(v) => SampleBufferMut::I24(v),
            SimulatedBuffer::I32(v) => SampleBufferMut::I32(v),
            SimulatedBuffer::F32(v) => SampleBufferMut::F32(v),
        }
    }

    pub fn samples(&self) -> usize {
        match self {
            SimulatedBuffer::U8(v) => v.len(),
            SimulatedBuffer::I16(v) => v.len(),
            SimulatedBuffer::I24(v) => v.len() / 3,
            SimulatedBuffer::I32(v) => v.len(),
            SimulatedBuffer::F32(v) => v.len(),
        }
    }
}

/// A playback device the simulated driver reports
#[derive(Debug, Clone)]
pub struct SimulatedOutput {
    pub name: String,
    pub is_default: bool,
    /// What the device settles on for a `StreamRequest::Native` open
    pub native: NegotiatedFormat,
    /// Additional exact triples the device accepts
    pub accepts: Vec<(HardwareFormat, u16, u32)>,
}

impl SimulatedOutput {
    pub fn new(name: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            is_default,
            native: NegotiatedFormat {
                format: HardwareFormat::F32,
                channels: 2,
                sample_rate: 48000,
                max_frames: Some(1024),
            },
            accepts: vec![(HardwareFormat::S16, 2, 48000)],
        }
    }

    pub fn with_native(mut self, format: HardwareFormat, channels: u16, sample_rate: u32) -> Self {
        self.native.format = format;
        self.native.channels = channels;
        self.native.sample_rate = sample_rate;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.native.max_frames = max_frames;
        self
    }

    fn negotiate(&self, request: &StreamRequest) -> Result<NegotiatedFormat> {
        match *request {
            StreamRequest::Native => Ok(self.native),
            StreamRequest::Exact {
                format,
                channels,
                sample_rate,
            } => {
                let native = (self.native.format, self.native.channels, self.native.sample_rate);
                let wanted = (format, channels, sample_rate);
                if native == wanted || self.accepts.contains(&wanted) {
                    Ok(NegotiatedFormat {
                        format,
                        channels,
                        sample_rate,
                        max_frames: self.native.max_frames,
                    })
                } else {
                    bail!(
                        "{} does not support {:?}/{}ch/{}Hz",
                        self.name,
                        format,
                        channels,
                        sample_rate
                    )
                }
            }
        }
    }
}

struct TickRequest {
    buffer: SimulatedBuffer,
    reply: Sender<SimulatedBuffer>,
}

struct HardwareState {
    ticks_tx: Sender<TickRequest>,
    ticks_rx: Receiver<TickRequest>,
    fail_enumeration: AtomicBool,
    fail_open: AtomicBool,
    fail_start: AtomicBool,
    opens: AtomicUsize,
    renders: AtomicUsize,
}

/// Test-side handle onto the simulated hardware clock.
///
/// Each [`render`](SimulatedHardware::render) call plays the role of one
/// buffer-ready event on the device's audio thread.
#[derive(Clone)]
pub struct SimulatedHardware {
    state: Arc<HardwareState>,
}

impl SimulatedHardware {
    fn new() -> Self {
        let (ticks_tx, ticks_rx) = bounded(0);
        Self {
            state: Arc::new(HardwareState {
                ticks_tx,
                ticks_rx,
                fail_enumeration: AtomicBool::new(false),
                fail_open: AtomicBool::new(false),
                fail_start: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                renders: AtomicUsize::new(0),
            }),
        }
    }

    /// Hand `buffer` to the streaming device and wait for it to come back.
    /// Returns `None` when no device is streaming.
    pub fn render(&self, buffer: SimulatedBuffer) -> Option<SimulatedBuffer> {
        let (reply, reply_rx) = bounded(1);
        self.state
            .ticks_tx
            .send_timeout(TickRequest { buffer, reply }, TICK_TIMEOUT)
            .ok()?;
        reply_rx.recv_timeout(TICK_TIMEOUT).ok()
    }

    pub fn set_fail_enumeration(&self, fail: bool) {
        self.state.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Number of successful device opens
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of render invocations delivered to any device
    pub fn render_count(&self) -> usize {
        self.state.renders.load(Ordering::SeqCst)
    }
}

/// Driver backed by simulated outputs, for tests and headless runs
pub struct SimulatedDriver {
    outputs: Vec<SimulatedOutput>,
    hardware: SimulatedHardware,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            hardware: SimulatedHardware::new(),
        }
    }

    pub fn with_output(mut self, output: SimulatedOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn hardware(&self) -> SimulatedHardware {
        self.hardware.clone()
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareDriver for SimulatedDriver {
    fn driver_id(&self) -> &str {
        "simulated"
    }

    fn subsystem_version(&self) -> &str {
        "0.0.0"
    }

    fn discover_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        if self.hardware.state.fail_enumeration.load(Ordering::SeqCst) {
            bail!("simulated context init failure");
        }

        Ok(self
            .outputs
            .iter()
            .enumerate()
            .map(|(idx, output)| {
                DeviceDescriptor::new(
                    DeviceId::indexed(ID_PREFIX, idx),
                    &output.name,
                    output.is_default,
                )
            })
            .collect())
    }

    fn open_device(
        &self,
        device: &DeviceDescriptor,
        request: &StreamRequest,
    ) -> Result<Box<dyn Device>> {
        if self.hardware.state.fail_open.load(Ordering::SeqCst) {
            bail!("simulated device init failure");
        }

        let output = device
            .id
            .index(ID_PREFIX)
            .and_then(|idx| self.outputs.get(idx))
            .filter(|o| o.name.as_str() == &*device.name)
            .ok_or_else(|| anyhow!("Unknown device {}", device.id))?;
        let negotiated = output.negotiate(request)?;

        self.hardware.state.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(SimulatedDevice {
            negotiated,
            hardware: self.hardware.clone(),
            worker: None,
            shutdown_tx: None,
        }))
    }
}

/// Opened simulated device; streams on its own thread between start and stop
pub struct SimulatedDevice {
    negotiated: NegotiatedFormat,
    hardware: SimulatedHardware,
    worker: Option<JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
}

impl Device for SimulatedDevice {
    fn negotiated(&self) -> NegotiatedFormat {
        self.negotiated
    }

    fn start(&mut self, mut render: RenderFn) -> Result<()> {
        if self.hardware.state.fail_start.load(Ordering::SeqCst) {
            bail!("simulated device start failure");
        }
        if self.worker.is_some() {
            bail!("device already streaming");
        }

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let ticks = self.hardware.state.ticks_rx.clone();
        let hardware = self.hardware.clone();
        let channels = self.negotiated.channels.max(1) as usize;

        let worker = std::thread::Builder::new()
            .name("simulated-audio".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticks) -> msg => {
                        let Ok(TickRequest { mut buffer, reply }) = msg else { break };
                        let frames = buffer.samples() / channels;
                        render(buffer.view(), frames);
                        hardware.state.renders.fetch_add(1, Ordering::SeqCst);
                        let _ = reply.send(buffer);
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            })
            .context("Failed to spawn simulated audio thread")?;

        self.worker = Some(worker);
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow!("simulated audio thread panicked"))?;
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
