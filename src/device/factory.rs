//! Device factory: enumeration and device instantiation
//!
//! A factory owns the descriptor cache for one backend. `scan`
//! replaces the cache wholesale; `create_device` resolves the
//! system-default sentinel against the latest scan and produces a
//! running device or an explicit error, never a silent null device.

use parking_lot::RwLock;

use crate::constants::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::convert::FillCallback;
use crate::device::{DeviceDescriptor, OutputDevice};
use crate::error::Result;

/// Which device to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTarget {
    /// The platform's system-default output device.
    Default,
    /// A device by index into the most recent scan.
    Index(usize),
}

/// Requested latency envelope in seconds; `start` drives the
/// mix-ahead depth.
#[derive(Debug, Clone, Copy)]
pub struct LatencySpec {
    pub min: f32,
    pub start: f32,
    pub max: f32,
}

impl Default for LatencySpec {
    fn default() -> Self {
        Self {
            min: 0.0,
            start: 0.02,
            max: 0.2,
        }
    }
}

/// Enumerates output devices for one backend and opens them.
pub trait OutputDeviceFactory: Send + Sync {
    /// Backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Re-enumerate devices, replacing the cached descriptor list
    /// wholesale and refreshing the default-device descriptor. A
    /// malformed device entry is skipped, not fatal.
    fn scan(&self) -> Result<()>;

    /// Descriptors from the most recent scan, in stable order.
    fn descriptors(&self) -> Vec<DeviceDescriptor>;

    /// Open a device and start its mixing thread.
    fn create_device(
        &self,
        callback: FillCallback,
        target: DeviceTarget,
        channels: usize,
        sample_rate: u32,
        block_size: usize,
        latency: LatencySpec,
    ) -> Result<Box<dyn OutputDevice>>;

    fn output_count(&self) -> usize {
        self.descriptors().len()
    }

    fn output_names(&self) -> Vec<String> {
        self.descriptors().into_iter().map(|d| d.name).collect()
    }

    /// Parallel to `output_names`, same scan order.
    fn output_max_channels(&self) -> Vec<u16> {
        self.descriptors().into_iter().map(|d| d.max_channels).collect()
    }
}

/// Descriptor cache backing a factory: holds the latest scan results
/// plus the descriptor the default-device sentinel resolves to.
///
/// `replace` swaps the whole list in one write so concurrent readers
/// see either the old scan or the new one, never a mix.
pub struct DescriptorCache {
    devices: RwLock<Vec<DeviceDescriptor>>,
    default: RwLock<DeviceDescriptor>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            default: RwLock::new(DeviceDescriptor {
                name: "default".to_string(),
                index: 0,
                max_channels: DEFAULT_CHANNELS,
                sample_rate: DEFAULT_SAMPLE_RATE,
            }),
        }
    }

    /// Replace the cached scan wholesale.
    pub fn replace(&self, devices: Vec<DeviceDescriptor>, default: DeviceDescriptor) {
        *self.devices.write() = devices;
        *self.default.write() = default;
    }

    pub fn snapshot(&self) -> Vec<DeviceDescriptor> {
        self.devices.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<DeviceDescriptor> {
        self.devices.read().get(index).cloned()
    }

    /// Descriptor the default-device sentinel currently resolves to.
    pub fn default_device(&self) -> DeviceDescriptor {
        self.default.read().clone()
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The native factory for this platform, already scanned.
pub fn default_factory() -> Result<Box<dyn OutputDeviceFactory>> {
    #[cfg(windows)]
    {
        let factory = crate::backend::winmm::WinmmOutputDeviceFactory::new();
        factory.scan()?;
        Ok(Box::new(factory))
    }
    #[cfg(not(windows))]
    {
        Err(crate::error::DeviceError::BackendUnavailable.into())
    }
}
