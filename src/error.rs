//! Error types for the audio output library

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Device and backend errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device not found: index {0}")]
    NotFound(usize),

    #[error("Could not open device with any attempted channel count")]
    NoCompatibleFormat,

    #[error("Failed to create synchronization primitive: {0}")]
    SyncPrimitive(String),

    #[error("Failed to submit buffer to output queue: {0}")]
    SubmitFailed(String),

    #[error("Failed to start mixing thread: {0}")]
    ThreadSpawn(String),

    #[error("No output backend is available on this platform")]
    BackendUnavailable,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
