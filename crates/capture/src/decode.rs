//! Decode loop contracts.
//!
//! A decode engine runs against a [`VideoSurface`] and reports one
//! [`DecodeTick`] per analysed frame. The loop is exposed as a
//! [`DecodeSubscription`]: a stream of ticks the owner pulls from, plus a
//! [`CancelHandle`] that stops the producer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use crate::error::ScanError;
use crate::surface::VideoSurface;

/// Ticks buffered between the engine and the session.
pub const TICK_BUFFER: usize = 64;

/// Result of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeTick {
    /// A barcode payload was read from the frame.
    Decoded(String),
    /// Nothing recognisable in this frame. Normal, not an error.
    NotFound,
    /// Any other decode failure.
    Fault(String),
}

/// Idempotent cancellation signal shared between a subscription and the
/// task producing its ticks.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the loop. Returns `true` only for the call that actually
    /// cancelled it.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
            self.inner.notify.notify_one();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.inner.notify.notified().await;
        }
    }
}

/// A running decode loop, owned by exactly one session.
pub struct DecodeSubscription {
    ticks: mpsc::Receiver<DecodeTick>,
    cancel: CancelHandle,
}

impl DecodeSubscription {
    pub fn new(ticks: mpsc::Receiver<DecodeTick>, cancel: CancelHandle) -> Self {
        Self { ticks, cancel }
    }

    /// Create a subscription together with the sending half for the producer.
    pub fn channel() -> (mpsc::Sender<DecodeTick>, CancelHandle, Self) {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let cancel = CancelHandle::new();
        (tx, cancel.clone(), Self::new(rx, cancel))
    }

    /// Wait for the next tick. Returns `None` once cancelled or when the
    /// producer has finished.
    pub async fn next_tick(&mut self) -> Option<DecodeTick> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            tick = self.ticks.recv() => tick,
            _ = self.cancel.cancelled() => None,
        }
    }

    /// Take an already queued tick without waiting.
    pub fn try_next_tick(&mut self) -> Option<DecodeTick> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.ticks.try_recv().ok()
    }

    /// Stop the producer and close the tick channel.
    pub fn cancel(&mut self) -> bool {
        let first = self.cancel.cancel();
        self.ticks.close();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for DecodeSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Abstract barcode decoder.
pub trait DecodeEngine: Send + Sync {
    /// Start decoding frames from the stream bound to `surface`.
    ///
    /// Implementations spawn their producer on the current tokio runtime.
    fn start_decoding(&self, surface: &VideoSurface) -> Result<DecodeSubscription, ScanError>;

    /// Engine name for logging.
    fn name(&self) -> &str;
}
