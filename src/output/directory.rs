use crate::error::{OutputError, Result};
use crate::hal::{DeviceDescriptor, HardwareDriver};
use std::sync::Arc;
use tracing::{debug, trace};

/// Names of the playback targets, as exposed to hosts for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTargets<'a> {
    pub names: &'a [Arc<str>],
    pub count: usize,
    pub default_index: Option<usize>,
}

/// Playback devices found when the session was created.
///
/// `names[i]` is always the display name of `descriptors[i]`, and at most
/// one descriptor carries the default flag.
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    descriptors: Vec<DeviceDescriptor>,
    names: Vec<Arc<str>>,
    default_index: Option<usize>,
}

impl DeviceDirectory {
    /// Query the driver once and cache what it reports
    pub fn enumerate(driver: &dyn HardwareDriver) -> Result<Self> {
        let found = driver
            .discover_devices()
            .map_err(|e| OutputError::enumeration(&e))?;
        Self::from_descriptors(found)
    }

    pub fn from_descriptors(found: Vec<DeviceDescriptor>) -> Result<Self> {
        let mut descriptors = Vec::new();
        descriptors
            .try_reserve_exact(found.len())
            .map_err(|_| OutputError::Allocation("device descriptors"))?;
        let mut names = Vec::new();
        names
            .try_reserve_exact(found.len())
            .map_err(|_| OutputError::Allocation("device names"))?;

        // Last device claiming default wins
        let default_index = found.iter().rposition(|d| d.is_default);

        for (idx, mut descriptor) in found.into_iter().enumerate() {
            if descriptor.is_default && Some(idx) != default_index {
                debug!(device = %descriptor.name, "ignoring duplicate default flag");
                descriptor.is_default = false;
            }
            trace!(device = %descriptor.name, default = descriptor.is_default, "playback device");
            names.push(Arc::clone(&descriptor.name));
            descriptors.push(descriptor);
        }

        Ok(Self {
            descriptors,
            names,
            default_index,
        })
    }

    pub fn descriptors(&self) -> &[DeviceDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn default_index(&self) -> Option<usize> {
        self.default_index
    }

    pub fn get(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.descriptors.get(index)
    }

    /// Index of the device called `name`. When several share the name the
    /// default wins, otherwise the first.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        match self.default_index {
            Some(idx) if &*self.names[idx] == name => Some(idx),
            _ => self.names.iter().position(|n| &**n == name),
        }
    }

    pub fn targets(&self) -> OutputTargets<'_> {
        OutputTargets {
            names: &self.names,
            count: self.names.len(),
            default_index: self.default_index,
        }
    }
}
