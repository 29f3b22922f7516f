//! Device-level error type.
//!
//! Devices report hard failures through this enum; buffered streams fold
//! them into sticky state bits and never propagate them across a read or
//! write call.

/// Failure reported by a [`Device`](crate::Device) operation.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Underlying OS error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The device does not implement the operation, or the stream mode
    /// forbids it.
    #[error("operation not supported")]
    Unsupported,
    /// The device accepted zero bytes while data remained to be written.
    #[error("device accepted no bytes with data remaining")]
    WriteZero,
    /// The deflate or inflate stream is corrupt or misused.
    #[error("compression stream error")]
    Compression,
    /// Seek target outside the addressable range of the device.
    #[error("seek out of range")]
    SeekRange,
    /// The stream already carries a sticky failure bit.
    #[error("stream is in a failed state")]
    StreamFailed,
}

/// Result alias used across the device layer.
pub type Result<T> = std::result::Result<T, DeviceError>;
