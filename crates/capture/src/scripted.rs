//! Scripted media and decode implementations.
//!
//! Used by tests and by the CLI's simulation mode. The provider hands out
//! streams that record how often they were stopped; the decode engine replays
//! a fixed list of ticks per loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::decode::{CancelHandle, DecodeEngine, DecodeSubscription, DecodeTick};
use crate::device::{Frame, Haptics, MediaProvider, MediaStream, VideoConstraints};
use crate::error::{AcquireError, ScanError};
use crate::host::{ScanHost, ScannedCode};
use crate::surface::VideoSurface;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A stream with no real device behind it.
pub struct ScriptedStream {
    id: String,
    live: AtomicBool,
    stops: AtomicUsize,
    double_stops: AtomicUsize,
}

impl ScriptedStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            live: AtomicBool::new(true),
            stops: AtomicUsize::new(0),
            double_stops: AtomicUsize::new(0),
        }
    }

    /// Calls to `stop_all_tracks` that actually stopped the stream.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Calls to `stop_all_tracks` on an already stopped stream.
    pub fn double_stops(&self) -> usize {
        self.double_stops.load(Ordering::SeqCst)
    }
}

impl MediaStream for ScriptedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        "scripted camera"
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn read_frame(&self) -> Option<Result<Frame, String>> {
        self.is_live().then(|| {
            Ok(Frame {
                width: 32,
                height: 32,
                luma: vec![255; 32 * 32],
            })
        })
    }

    fn stop_all_tracks(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        } else {
            tracing::warn!(stream = %self.id, "Stream stopped twice");
            self.double_stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Media provider that grants scripted streams, or fails on demand.
#[derive(Default)]
pub struct ScriptedProvider {
    requests: AtomicUsize,
    always_fail: Option<AcquireError>,
    pending_failures: Mutex<VecDeque<AcquireError>>,
    latency: Duration,
    streams: Mutex<Vec<Arc<ScriptedStream>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every request fails with `error`.
    pub fn failing(error: AcquireError) -> Self {
        Self {
            always_fail: Some(error),
            ..Self::default()
        }
    }

    /// Delay each request, simulating a permission prompt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next request only.
    pub fn fail_next(&self, error: AcquireError) {
        lock(&self.pending_failures).push_back(error);
    }

    /// Number of stream requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Streams handed out so far.
    pub fn streams(&self) -> Vec<Arc<ScriptedStream>> {
        lock(&self.streams).clone()
    }

    /// Effective stops across every stream handed out.
    pub fn total_stops(&self) -> usize {
        lock(&self.streams).iter().map(|s| s.stops()).sum()
    }

    /// Redundant stops across every stream handed out.
    pub fn double_stops(&self) -> usize {
        lock(&self.streams).iter().map(|s| s.double_stops()).sum()
    }

    /// Streams that are still live.
    pub fn live_streams(&self) -> usize {
        lock(&self.streams).iter().filter(|s| s.is_live()).count()
    }
}

#[async_trait::async_trait]
impl MediaProvider for ScriptedProvider {
    async fn request_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = lock(&self.pending_failures).pop_front() {
            return Err(error);
        }

        tracing::debug!(facing = ?constraints.facing, "Granting scripted stream");
        let stream = Arc::new(ScriptedStream::new(format!("scripted-{n}")));
        lock(&self.streams).push(stream.clone());
        Ok(stream)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Decode engine that replays scripted ticks.
///
/// Each started loop consumes the next queued script; once the queue is empty
/// loops produce nothing and wait for cancellation.
#[derive(Default)]
pub struct ScriptedDecodeEngine {
    scripts: Mutex<VecDeque<Vec<DecodeTick>>>,
    interval: Duration,
    end_after_script: bool,
    handles: Mutex<Vec<CancelHandle>>,
}

impl ScriptedDecodeEngine {
    /// Engine whose loops never produce a tick.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Engine whose first loop replays `ticks`.
    pub fn new(ticks: Vec<DecodeTick>) -> Self {
        Self::with_runs(vec![ticks])
    }

    /// Engine with one script per successive loop.
    pub fn with_runs(runs: Vec<Vec<DecodeTick>>) -> Self {
        Self {
            scripts: Mutex::new(runs.into()),
            ..Self::default()
        }
    }

    /// Pause between ticks, like a camera frame interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Close the tick stream once the script runs out.
    pub fn ending_after_script(mut self) -> Self {
        self.end_after_script = true;
        self
    }

    pub fn loops_started(&self) -> usize {
        lock(&self.handles).len()
    }

    pub fn loops_cancelled(&self) -> usize {
        lock(&self.handles)
            .iter()
            .filter(|h| h.is_cancelled())
            .count()
    }
}

impl DecodeEngine for ScriptedDecodeEngine {
    fn start_decoding(&self, surface: &VideoSurface) -> Result<DecodeSubscription, ScanError> {
        if !surface.is_bound() {
            return Err(ScanError::DecodeEngineFault(
                "no stream bound to the video surface".to_string(),
            ));
        }

        let ticks = lock(&self.scripts).pop_front().unwrap_or_default();
        let (tx, cancel, subscription) = DecodeSubscription::channel();
        lock(&self.handles).push(cancel.clone());

        let interval = self.interval;
        let end_after_script = self.end_after_script;
        tokio::spawn(async move {
            for tick in ticks {
                if !interval.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                if cancel.is_cancelled() || tx.send(tick).await.is_err() {
                    return;
                }
            }
            if !end_after_script {
                cancel.cancelled().await;
            }
        });

        Ok(subscription)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Parse a tick script.
///
/// One directive per line; blank lines and `#` comments are skipped:
///
/// ```text
/// miss 20          # twenty empty frames
/// fault checksum mismatch
/// code 7501234567890 3
/// ```
pub fn parse_tick_script(script: &str) -> Result<Vec<DecodeTick>, String> {
    let mut ticks = Vec::new();
    for (index, raw) in script.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let lineno = index + 1;
        let mut parts = line.split_whitespace();
        let directive = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        let count = |arg: Option<&&str>| -> Result<usize, String> {
            match arg {
                None => Ok(1),
                Some(n) => n
                    .parse::<usize>()
                    .map_err(|_| format!("line {lineno}: invalid repeat count '{n}'")),
            }
        };

        match directive {
            "miss" => {
                let n = count(rest.first())?;
                ticks.extend(std::iter::repeat(DecodeTick::NotFound).take(n));
            }
            "code" => {
                let value = rest
                    .first()
                    .ok_or_else(|| format!("line {lineno}: 'code' needs a value"))?;
                let n = count(rest.get(1))?;
                ticks.extend(std::iter::repeat(DecodeTick::Decoded(value.to_string())).take(n));
            }
            "fault" => {
                let message = if rest.is_empty() {
                    "decode fault".to_string()
                } else {
                    rest.join(" ")
                };
                ticks.push(DecodeTick::Fault(message));
            }
            other => return Err(format!("line {lineno}: unknown directive '{other}'")),
        }
    }
    Ok(ticks)
}

/// Host that records everything the session reports.
#[derive(Clone, Default)]
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
}

#[derive(Default)]
struct HostLog {
    scanned: Vec<ScannedCode>,
    closes: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scanned(&self) -> Vec<ScannedCode> {
        lock(&self.log).scanned.clone()
    }

    pub fn values(&self) -> Vec<String> {
        lock(&self.log)
            .scanned
            .iter()
            .map(|c| c.value.clone())
            .collect()
    }

    pub fn closes(&self) -> usize {
        lock(&self.log).closes
    }
}

impl ScanHost for RecordingHost {
    fn on_scanned(&mut self, code: &ScannedCode) {
        lock(&self.log).scanned.push(code.clone());
    }

    fn on_close(&mut self) {
        lock(&self.log).closes += 1;
    }
}

/// Haptics that count pulses.
#[derive(Default)]
pub struct CountingHaptics {
    pulses: AtomicUsize,
}

impl CountingHaptics {
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Haptics for CountingHaptics {
    fn vibrate(&self, _duration: Duration) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}
