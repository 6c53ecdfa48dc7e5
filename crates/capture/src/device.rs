//! Media capture contracts: camera providers, live streams, and haptics.

use std::sync::Arc;
use std::time::Duration;

use tillscan_common::config::{FacingMode, ScannerDefaults};

use crate::error::AcquireError;

/// Requested properties of the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Preferred camera.
    pub facing: FacingMode,

    /// Ideal frame width. Providers may deliver a different size.
    pub ideal_width: u32,

    /// Ideal frame height.
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

impl From<&ScannerDefaults> for VideoConstraints {
    fn from(defaults: &ScannerDefaults) -> Self {
        Self {
            facing: defaults.facing,
            ideal_width: defaults.ideal_width,
            ideal_height: defaults.ideal_height,
        }
    }
}

/// A single grayscale video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major 8-bit luma, `width * height` bytes.
    pub luma: Vec<u8>,
}

impl Frame {
    /// Wrap raw luma data, rejecting buffers that don't match the dimensions.
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> Option<Self> {
        if luma.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            luma,
        })
    }

    /// Luma value at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width as usize + x]
    }
}

/// A live camera stream.
///
/// Streams are shared between the session, the video surface and the decode
/// loop, so every method takes `&self`.
pub trait MediaStream: Send + Sync {
    /// Stable identifier for logging.
    fn id(&self) -> &str;

    /// Human-readable device label.
    fn label(&self) -> &str;

    /// Whether any track is still delivering frames.
    fn is_live(&self) -> bool;

    /// Read the next frame.
    ///
    /// `None` means the stream has ended or was stopped; `Some(Err(_))` is a
    /// frame that could not be read.
    fn read_frame(&self) -> Option<Result<Frame, String>>;

    /// Stop every track. Stopping an already stopped stream does nothing.
    fn stop_all_tracks(&self);
}

/// Source of camera streams.
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    /// Request a live video stream. This is the only suspension point of a
    /// capture session (permission prompt, device open).
    async fn request_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Vibration support, when the platform has it.
pub trait Haptics: Send + Sync {
    fn vibrate(&self, duration: Duration);
}
