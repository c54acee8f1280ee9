//! Entry points a host uses to drive the bridge.
//!
//! Everything here forwards to [`OutputSession`]; negotiation and the
//! render path live in [`crate::output`].

use crate::config::OutputConfig;
use crate::error::{OutputError, Result};
use crate::hal::{FormatTable, HardwareDriver};
use crate::output::{OutputSession, OutputTargets, PlaybackProducer};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Version of the entry-point contract below
pub const OUTPUT_PLUGIN_API_VERSION: u32 = 1;

/// Process-wide state built once by [`OutputPlugin::static_init`] and shared
/// read-only by every session.
#[derive(Debug, Default)]
pub struct InitContext {
    formats: FormatTable,
}

impl InitContext {
    pub fn new() -> Self {
        Self {
            formats: FormatTable::build(),
        }
    }

    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }
}

/// Informational plugin descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub api_version: u32,
    pub name: String,
    pub version: &'static str,
    pub subsystem_version: String,
}

/// Output plugin over one hardware driver
pub struct OutputPlugin {
    driver: Arc<dyn HardwareDriver>,
    config: OutputConfig,
    context: OnceCell<Arc<InitContext>>,
}

impl OutputPlugin {
    pub fn new(driver: impl HardwareDriver + 'static) -> Self {
        Self {
            driver: Arc::new(driver),
            config: OutputConfig::default(),
            context: OnceCell::new(),
        }
    }

    pub fn with_config(mut self, config: OutputConfig) -> Self {
        self.config = config;
        self
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            api_version: OUTPUT_PLUGIN_API_VERSION,
            name: self.driver.driver_id().to_string(),
            version: env!("CARGO_PKG_VERSION"),
            subsystem_version: self.driver.subsystem_version().to_string(),
        }
    }

    /// Build the format table. Later calls return the same context.
    pub fn static_init(&self) -> Arc<InitContext> {
        Arc::clone(self.context.get_or_init(|| {
            debug!(driver = self.driver.driver_id(), "format table built");
            Arc::new(InitContext::new())
        }))
    }

    pub fn create(&self) -> Result<OutputSession> {
        let context = self.context.get().cloned().ok_or(OutputError::NotInitialized)?;
        OutputSession::create(context, Arc::clone(&self.driver), self.config.clone())
    }

    pub fn destroy(&self, session: OutputSession) -> Result<()> {
        session.destroy()
    }

    pub fn enumerate_targets<'a>(&self, session: &'a OutputSession) -> OutputTargets<'a> {
        session.targets()
    }

    /// Start playback; failures are logged by the session and leave it
    /// ready for a retry.
    pub fn start<P: PlaybackProducer>(&self, session: &mut OutputSession, producer: P) {
        if let Err(e) = session.start(producer) {
            error!(driver = self.driver.driver_id(), error = %e, "start failed");
        }
    }

    pub fn stop(&self, session: &mut OutputSession) {
        if let Err(e) = session.stop() {
            error!(driver = self.driver.driver_id(), error = %e, "stop failed");
        }
    }
}
