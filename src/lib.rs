pub mod config;
pub mod error;
pub mod hal;
pub mod output;
pub mod plugin;

pub use config::{NegotiationMode, OutputConfig};
pub use error::{OutputError, Result};
pub use hal::{AudioFormat, SampleBufferMut, SampleFormat};
pub use output::{from_fn, OutputSession, OutputTargets, PlaybackProducer, SessionState};
pub use plugin::{InitContext, OutputPlugin, PluginInfo, OUTPUT_PLUGIN_API_VERSION};
