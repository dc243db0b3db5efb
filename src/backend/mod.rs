//! Platform output backends
//!
//! A backend owns the native handle for one open output stream and
//! exposes the small queue surface the buffered driver consumes:
//! submit a filled slot, report slot completion, flush on shutdown.
//! Completion must additionally signal the wake channel handed to the
//! backend at open time so the mixing thread unblocks promptly.

#[cfg(windows)]
pub mod winmm;

use crate::error::DeviceError;

/// The native submission queue behind one open device.
///
/// The mixing thread is the sole caller after construction; a slot is
/// never written while queued, and `flush` must leave every slot
/// eventually reporting complete so shutdown can drain.
pub trait PlatformQueue: Send + 'static {
    /// Number of hardware buffer slots (mix-ahead depth + 1).
    fn slot_count(&self) -> usize;

    /// Whether the platform is done with this slot. Freshly opened
    /// queues report every slot complete.
    fn is_complete(&self, slot: usize) -> bool;

    /// Copy `samples` into the slot's native buffer and queue it for
    /// playback. A failure here is fatal for the device instance.
    fn submit(&mut self, slot: usize, samples: &[i16]) -> Result<(), DeviceError>;

    /// Stop playback and release anything still queued. Called once,
    /// by the mixing thread, on its way out.
    fn flush(&mut self);
}
