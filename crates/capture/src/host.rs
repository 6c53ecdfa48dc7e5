//! The boundary between a capture session and the UI hosting it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Notify;

/// Where a reported code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Camera,
    Manual,
}

/// A code reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedCode {
    pub value: String,
    pub source: ScanSource,
}

/// Receiver of session output.
pub trait ScanHost: Send {
    /// A non-duplicate code was scanned or typed.
    fn on_scanned(&mut self, code: &ScannedCode);

    /// The session has released everything and closed.
    fn on_close(&mut self) {}
}

/// Lets the host dismiss a session that is busy in [`crate::CaptureSession::run`]
/// or waiting on the camera.
#[derive(Debug, Clone, Default)]
pub struct DismissHandle {
    inner: Arc<DismissInner>,
}

#[derive(Debug, Default)]
struct DismissInner {
    dismissed: AtomicBool,
    notify: Notify,
}

impl DismissHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that the host surface was closed.
    pub fn dismiss(&self) {
        self.inner.dismissed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        self.inner.notify.notify_one();
    }

    pub fn is_dismissed(&self) -> bool {
        self.inner.dismissed.load(Ordering::SeqCst)
    }

    /// Resolves once the host has dismissed the session.
    pub async fn dismissed(&self) {
        while !self.is_dismissed() {
            self.inner.notify.notified().await;
        }
    }

    /// Clear the signal for a new open period.
    pub(crate) fn reset(&self) {
        self.inner.dismissed.store(false, Ordering::SeqCst);
    }
}
