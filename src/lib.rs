//! # audio-out
//!
//! Callback-driven audio output with channel remixing and buffered
//! hardware backends.
//!
//! Application code registers a single pull callback that fills float
//! buffers on demand; the library adapts that stream to whatever the
//! platform output hardware actually accepts (channel count, sample
//! rate, sample format) and keeps the hardware queue fed from a
//! dedicated mixing thread.
//!
//! ## Architecture Overview
//!
//! ```text
//!  application callback (f32, app channels, app rate)
//!          │ pull
//!          ▼
//!  ┌──────────────────────────────┐
//!  │  SampleFormatConverter       │  convert::SampleFormatConverter
//!  │   remix ──► resample ──►     │  remix engine: remix::*
//!  │   quantize to i16            │
//!  └──────────────┬───────────────┘
//!                 │ one block per free slot
//!                 ▼
//!  ┌──────────────────────────────┐
//!  │  BufferedOutput              │  device::driver::BufferedOutput
//!  │   slot ring (mix-ahead + 1)  │
//!  │   mixing thread              │
//!  └──────────────┬───────────────┘
//!                 │ submit / completion wake
//!                 ▼
//!  ┌──────────────────────────────┐
//!  │  PlatformQueue               │  backend::PlatformQueue
//!  │   (WinMM on Windows)         │  backend::winmm
//!  └──────────────────────────────┘
//! ```
//!
//! Devices are discovered and opened through an
//! [`OutputDeviceFactory`](device::factory::OutputDeviceFactory); the
//! factory probes native capabilities once per scan and resolves the
//! system-default sentinel at creation time.

pub mod backend;
pub mod convert;
pub mod device;
pub mod error;
pub mod remix;

pub use convert::{FillCallback, SampleFormatConverter};
pub use device::factory::{default_factory, DeviceTarget, LatencySpec, OutputDeviceFactory};
pub use device::{DeviceDescriptor, DeviceState, OutputDevice};
pub use error::{DeviceError, Error, Result};

/// Library-wide constants
pub mod constants {
    /// Sample rate assumed when a device reports nothing usable
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Channel count assumed when a device reports nothing usable
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Channel counts attempted when opening or probing a device,
    /// in priority order
    pub const CHANNEL_CANDIDATES: [u16; 3] = [8, 6, 2];

    /// Sample rates attempted when probing a device, in priority order
    pub const PROBE_SAMPLE_RATES: [u32; 3] = [48000, 44100, 22050];

    /// Ceiling on the mixing thread's wait for a buffer-completion
    /// signal; bounds worst-case stop latency
    pub const WAKE_WAIT_MS: u64 = 5;

    /// Largest channel count covered by the known-pair mixing matrices
    pub const MAX_KNOWN_CHANNELS: usize = 8;
}
