use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error};
use crate::hal::{Device, NegotiatedFormat, RenderFn, SampleBufferMut};
use super::audio::output_at;

/// How long `start` waits for the stream thread to report back
const START_TIMEOUT: Duration = Duration::from_secs(5);

/// Opened cpal playback device.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
/// for the duration of each start/stop cycle; stopping drops the stream on
/// that thread and joins it.
pub struct AudioDevice {
    index: usize,
    device_name: String,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    negotiated: NegotiatedFormat,
    worker: Option<JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
}

impl AudioDevice {
    pub fn new(
        index: usize,
        device_name: String,
        config: cpal::StreamConfig,
        sample_format: cpal::SampleFormat,
        negotiated: NegotiatedFormat,
    ) -> Self {
        Self {
            index,
            device_name,
            config,
            sample_format,
            negotiated,
            worker: None,
            shutdown_tx: None,
        }
    }
}

impl Device for AudioDevice {
    fn negotiated(&self) -> NegotiatedFormat {
        self.negotiated
    }

    fn start(&mut self, render: RenderFn) -> Result<()> {
        if self.worker.is_some() {
            bail!("device already streaming");
        }

        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let index = self.index;
        let name = self.device_name.clone();
        let config = self.config.clone();
        let sample_format = self.sample_format;

        let worker = std::thread::Builder::new()
            .name("cpal-output".to_string())
            .spawn(move || {
                let stream = match build_stream(index, &name, &config, sample_format, render) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(anyhow!(e).context("Failed to start stream")));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until stop (or until the device is dropped)
                let _ = shutdown_rx.recv();
                if let Err(e) = stream.pause() {
                    debug!(error = %e, "stream pause failed during shutdown");
                }
                drop(stream);
            })
            .context("Failed to spawn cpal output thread")?;

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                self.shutdown_tx = Some(shutdown_tx);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                // Dropping shutdown_tx lets the thread exit once it gets that far
                drop(shutdown_tx);
                bail!("timed out starting {}", self.device_name)
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow!("cpal output thread panicked"))?;
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn build_stream(
    index: usize,
    name: &str,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mut render: RenderFn,
) -> Result<cpal::Stream> {
    let device = output_at(index, name)?;
    let channels = config.channels.max(1) as usize;

    device
        .build_output_stream_raw(
            config,
            sample_format,
            move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                match data.sample_format() {
                    cpal::SampleFormat::U8 => {
                        if let Some(samples) = data.as_slice_mut::<u8>() {
                            render(SampleBufferMut::U8(samples), frames);
                        }
                    }
                    cpal::SampleFormat::I16 => {
                        if let Some(samples) = data.as_slice_mut::<i16>() {
                            render(SampleBufferMut::I16(samples), frames);
                        }
                    }
                    cpal::SampleFormat::I32 => {
                        if let Some(samples) = data.as_slice_mut::<i32>() {
                            render(SampleBufferMut::I32(samples), frames);
                        }
                    }
                    cpal::SampleFormat::F32 => {
                        if let Some(samples) = data.as_slice_mut::<f32>() {
                            render(SampleBufferMut::F32(samples), frames);
                        }
                    }
                    _ => render(SampleBufferMut::Bytes(data.bytes_mut()), frames),
                }
            },
            |err| error!(error = %err, "cpal stream error"),
            None,
        )
        .with_context(|| format!("Failed to build output stream on {}", name))
}
