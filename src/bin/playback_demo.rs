use clap::Parser;
use playback_bridge::hal::drivers::AudioDriver;
use playback_bridge::{
    from_fn, AudioFormat, NegotiationMode, OutputConfig, OutputPlugin, SampleBufferMut, SampleFormat,
};
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Play a test tone through the default output device
#[derive(Parser, Debug)]
struct Args {
    /// JSON session config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request 16-bit stereo at 48 kHz instead of the hardware's own format
    #[arg(long)]
    fixed: bool,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    frequency: f32,

    /// How long to play
    #[arg(long, default_value_t = 3)]
    seconds: u64,

    /// Only list playback devices
    #[arg(long)]
    list: bool,
}

struct Sine {
    frequency: f32,
    phase: f32,
}

impl Sine {
    fn next(&mut self, sample_rate: u32) -> f32 {
        let value = (self.phase * TAU).sin() * 0.2;
        self.phase = (self.phase + self.frequency / sample_rate as f32).fract();
        value
    }

    fn render(&mut self, output: SampleBufferMut<'_>, format: AudioFormat, frames: usize) -> bool {
        let channels = format.channels as usize;
        match (output, format.format) {
            (SampleBufferMut::F32(out), SampleFormat::F32) => {
                for frame in out.chunks_exact_mut(channels).take(frames) {
                    frame.fill(self.next(format.sample_rate));
                }
            }
            (SampleBufferMut::I16(out), SampleFormat::I16) => {
                for frame in out.chunks_exact_mut(channels).take(frames) {
                    frame.fill((self.next(format.sample_rate) * i16::MAX as f32) as i16);
                }
            }
            (SampleBufferMut::I32(out), SampleFormat::I32) => {
                for frame in out.chunks_exact_mut(channels).take(frames) {
                    frame.fill((self.next(format.sample_rate) * i32::MAX as f32) as i32);
                }
            }
            (SampleBufferMut::U8(out), SampleFormat::U8) => {
                for frame in out.chunks_exact_mut(channels).take(frames) {
                    frame.fill((self.next(format.sample_rate) * 127.0 + 128.0) as u8);
                }
            }
            (SampleBufferMut::I24(out), SampleFormat::I24) => {
                for frame in out.chunks_exact_mut(channels * 3).take(frames) {
                    let value = (self.next(format.sample_rate) * 8_388_607.0) as i32;
                    let bytes = value.to_le_bytes();
                    for sample in frame.chunks_exact_mut(3) {
                        sample.copy_from_slice(&bytes[..3]);
                    }
                }
            }
            _ => return false,
        }
        true
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .try_init()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OutputConfig::load(path)?,
        None => OutputConfig::default(),
    };
    if args.fixed {
        config.mode = NegotiationMode::fixed_default();
    }

    let plugin = OutputPlugin::new(AudioDriver::new()).with_config(config);
    let info = plugin.info();
    println!("{} {} (cpal {})", info.name, info.version, info.subsystem_version);

    plugin.static_init();
    let mut session = plugin.create()?;

    let targets = plugin.enumerate_targets(&session);
    for (idx, name) in targets.names.iter().enumerate() {
        let marker = if Some(idx) == targets.default_index { "*" } else { " " };
        println!("{} {}: {}", marker, idx, name);
    }

    if args.list {
        return Ok(plugin.destroy(session)?);
    }

    let mut sine = Sine {
        frequency: args.frequency,
        phase: 0.0,
    };
    session.start(from_fn(move |output, format, frames| sine.render(output, format, frames)))?;

    if let Some(negotiated) = session.negotiated() {
        println!(
            "Playing {} Hz: {:?} {}ch {} Hz",
            args.frequency, negotiated.format, negotiated.channels, negotiated.sample_rate
        );
    }

    std::thread::sleep(Duration::from_secs(args.seconds));

    plugin.stop(&mut session);
    plugin.destroy(session)?;
    Ok(())
}
