//! Device abstraction and lifecycle
//!
//! A platform-independent handle representing one open output stream,
//! plus the descriptor type produced by device scans.

pub mod driver;
pub mod factory;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Lifecycle of an open device instance.
///
/// `Constructed` exists only during creation; `stop` moves a running
/// device through `Stopping` (mixing thread draining) to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Constructed,
    Running,
    Stopping,
    Stopped,
}

/// One open output stream.
///
/// Dropping an instance stops it first; the hardware handle is never
/// released while buffers are still queued.
pub trait OutputDevice: Send {
    /// Request shutdown and block until the mixing thread has drained
    /// all queued buffers and exited. Idempotent: a second call while
    /// stopping or stopped is a no-op.
    fn stop(&mut self);

    fn state(&self) -> DeviceState;

    fn is_running(&self) -> bool {
        self.state() == DeviceState::Running
    }

    /// Hardware channel count the device actually opened with.
    fn channels(&self) -> usize;

    /// Hardware sample rate the device actually opened with.
    fn sample_rate(&self) -> u32;

    /// Surface a fatal runtime error recorded by the mixing thread
    /// (buffer submission failure). Returns `None` while healthy.
    fn take_error(&self) -> Option<DeviceError>;
}

/// Immutable description of an output device, populated during a scan
/// and replaced wholesale on rescan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Device name as reported by the platform
    pub name: String,
    /// Platform-specific device index within the scan that produced it
    pub index: usize,
    /// Maximum channel count the device accepted during probing
    pub max_channels: u16,
    /// Native sample rate the device accepted during probing
    pub sample_rate: u32,
}

/// Smallest number of mix-ahead blocks whose cumulative duration
/// exceeds the requested start latency.
pub fn mix_ahead_for_latency(block_size: usize, sample_rate: u32, start_latency: f32) -> usize {
    let mut mix_ahead = 0usize;
    while mix_ahead as f32 * block_size as f32 / sample_rate as f32 <= start_latency {
        mix_ahead += 1;
    }
    mix_ahead
}
