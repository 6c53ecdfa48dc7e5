//! Error taxonomy for capture sessions.

use tillscan_common::error::TillscanError;

/// Why the camera could not be acquired.
///
/// All variants are user-visible and retryable: the session never retries on
/// its own, the operator does by activating the camera again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("no camera available: {0}")]
    NoDevice(String),

    #[error("camera access requires a secure context")]
    InsecureContext,

    #[error("camera failed to start: {0}")]
    Device(String),
}

/// Errors surfaced by a [`crate::CaptureSession`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("decode engine fault: {0}")]
    DecodeEngineFault(String),

    #[error("manual entry is empty")]
    InvalidManualInput,

    #[error("camera is already streaming")]
    AlreadyStreaming,

    #[error("scanner is not open")]
    NotOpen,
}

/// Flat classification of [`ScanError`] for hosts that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    NoDevice,
    DecodeEngineFault,
    InvalidManualInput,
    InvalidState,
}

impl AcquireError {
    /// Message suitable for showing next to the "activate camera" control.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => {
                "Camera access was denied. Allow camera access and try again, or enter the code manually."
            }
            Self::NoDevice(_) => "No camera was found. Enter the code manually.",
            Self::InsecureContext => {
                "The camera is only available over a secure connection. Enter the code manually."
            }
            Self::Device(_) => "The camera could not be started. Try again or enter the code manually.",
        }
    }
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Acquire(AcquireError::PermissionDenied(_) | AcquireError::InsecureContext) => {
                ErrorKind::PermissionDenied
            }
            Self::Acquire(AcquireError::NoDevice(_) | AcquireError::Device(_)) => ErrorKind::NoDevice,
            Self::DecodeEngineFault(_) => ErrorKind::DecodeEngineFault,
            Self::InvalidManualInput => ErrorKind::InvalidManualInput,
            Self::AlreadyStreaming | Self::NotOpen => ErrorKind::InvalidState,
        }
    }

    /// Message suitable for the scanner dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::Acquire(e) => e.user_message().to_string(),
            Self::DecodeEngineFault(_) => {
                "The scanner stopped reading frames. Try again or enter the code manually.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ScanError> for TillscanError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Acquire(AcquireError::PermissionDenied(message)) => {
                TillscanError::PermissionDenied { message }
            }
            ScanError::DecodeEngineFault(message) => TillscanError::decode(message),
            other => TillscanError::capture(other.to_string()),
        }
    }
}
