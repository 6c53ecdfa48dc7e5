//! Capture session lifecycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tillscan_common::config::{DecodeFaultPolicy, ScanPolicy, ScannerDefaults};

use crate::decode::{DecodeEngine, DecodeSubscription, DecodeTick};
use crate::device::{Haptics, MediaProvider, MediaStream, VideoConstraints};
use crate::error::ScanError;
use crate::host::{DismissHandle, ScanHost, ScanSource, ScannedCode};
use crate::surface::VideoSurface;

/// Length of the vibration cue after a successful scan.
const HAPTIC_PULSE: Duration = Duration::from_millis(100);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Options for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// What happens after a code is reported.
    pub policy: ScanPolicy,

    /// Camera request sent to the media provider.
    pub constraints: VideoConstraints,

    /// Treatment of decode faults.
    pub fault_policy: DecodeFaultPolicy,

    /// Vibrate on success when haptics are attached.
    pub haptics: bool,
}

impl From<&ScannerDefaults> for SessionOptions {
    fn from(defaults: &ScannerDefaults) -> Self {
        Self {
            policy: defaults.policy,
            constraints: VideoConstraints::from(defaults),
            fault_policy: defaults.fault_policy,
            haptics: defaults.haptics,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ScannerDefaults::default())
    }
}

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream and no decode loop.
    Idle,
    /// Waiting for the media provider.
    Acquiring,
    /// Decode loop running against a live stream.
    Streaming,
    /// A code is being reported.
    Reporting,
}

/// One open-to-close lifecycle of camera-based barcode scanning.
///
/// The session exclusively owns its stream and decode loop. Every exit path
/// (explicit [`close`](Self::close), host dismissal, drop) goes through the
/// same idempotent teardown.
pub struct CaptureSession {
    id: u64,
    options: SessionOptions,
    provider: Arc<dyn MediaProvider>,
    engine: Arc<dyn DecodeEngine>,
    host: Box<dyn ScanHost>,
    haptics: Option<Arc<dyn Haptics>>,
    surface: VideoSurface,
    state: SessionState,
    open: bool,
    stream: Option<Arc<dyn MediaStream>>,
    subscription: Option<DecodeSubscription>,
    decoded_value: Option<String>,
    already_reported: bool,
    reported_values: HashSet<String>,
    last_error: Option<ScanError>,
    consecutive_faults: u32,
    dismiss: DismissHandle,
}

impl CaptureSession {
    /// Create an idle session.
    pub fn new(
        options: SessionOptions,
        provider: Arc<dyn MediaProvider>,
        engine: Arc<dyn DecodeEngine>,
        host: Box<dyn ScanHost>,
    ) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            options,
            provider,
            engine,
            host,
            haptics: None,
            surface: VideoSurface::new(),
            state: SessionState::Idle,
            open: false,
            stream: None,
            subscription: None,
            decoded_value: None,
            already_reported: false,
            reported_values: HashSet::new(),
            last_error: None,
            consecutive_faults: 0,
            dismiss: DismissHandle::new(),
        }
    }

    /// Attach a vibration device.
    pub fn with_haptics(mut self, haptics: Arc<dyn Haptics>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether the host surface is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Last code reported in this session, kept across close.
    pub fn decoded_value(&self) -> Option<&str> {
        self.decoded_value.as_deref()
    }

    pub fn already_reported(&self) -> bool {
        self.already_reported
    }

    /// Error to show in the scanner dialog, if any.
    pub fn last_error(&self) -> Option<&ScanError> {
        self.last_error.as_ref()
    }

    pub fn video_surface(&self) -> &VideoSurface {
        &self.surface
    }

    /// Handle the host uses to dismiss the session from another task.
    pub fn dismiss_handle(&self) -> DismissHandle {
        self.dismiss.clone()
    }

    /// Open the session and start the camera.
    ///
    /// Also used to retry after a failed acquisition while the host surface
    /// is still open. On failure `last_error` is set, the session stays idle
    /// and manual entry remains available.
    pub async fn open(&mut self) -> Result<(), ScanError> {
        if matches!(
            self.state,
            SessionState::Acquiring | SessionState::Streaming | SessionState::Reporting
        ) {
            return Err(ScanError::AlreadyStreaming);
        }

        self.close_if_dismissed();
        if !self.open {
            tracing::info!(session = self.id, policy = ?self.options.policy, "Opening scanner");
            self.open = true;
            self.already_reported = false;
            self.reported_values.clear();
            self.dismiss.reset();
        }
        self.last_error = None;

        self.acquire().await
    }

    /// Feed one decode result into the session.
    pub async fn on_decode_tick(&mut self, tick: DecodeTick) {
        match tick {
            DecodeTick::Decoded(value) => {
                self.consecutive_faults = 0;
                if self.close_if_dismissed() {
                    return;
                }
                if self.state != SessionState::Streaming {
                    tracing::trace!(session = self.id, "Ignoring decode outside streaming state");
                    return;
                }
                self.report(value, ScanSource::Camera).await;
            }
            DecodeTick::NotFound => {
                self.consecutive_faults = 0;
                tracing::trace!(session = self.id, "No barcode in frame");
            }
            DecodeTick::Fault(message) => self.handle_fault(message),
        }
    }

    /// Submit a typed code through the same path as a camera decode.
    ///
    /// Returns whether the code was emitted; duplicates suppressed by the
    /// active policy return `Ok(false)`.
    pub async fn manual_entry(&mut self, value: &str) -> Result<bool, ScanError> {
        let code = value.trim();
        if code.is_empty() {
            tracing::debug!(session = self.id, "Rejected empty manual entry");
            return Err(ScanError::InvalidManualInput);
        }
        if self.close_if_dismissed() || !self.open {
            return Err(ScanError::NotOpen);
        }
        Ok(self.report(code.to_string(), ScanSource::Manual).await)
    }

    /// Drive the decode loop until the session stops streaming or the host
    /// dismisses it.
    pub async fn run(&mut self) {
        let dismiss = self.dismiss.clone();
        loop {
            if dismiss.is_dismissed() {
                self.close();
                return;
            }

            let Some(subscription) = self.subscription.as_mut() else {
                return;
            };

            let next = tokio::select! {
                tick = subscription.next_tick() => Some(tick),
                _ = dismiss.dismissed() => None,
            };
            let Some(tick) = next else {
                tracing::info!(session = self.id, "Scanner dismissed by host");
                self.close();
                return;
            };

            match tick {
                Some(tick) => self.on_decode_tick(tick).await,
                None => {
                    tracing::warn!(session = self.id, "Decode loop ended unexpectedly");
                    self.teardown();
                    self.state = SessionState::Idle;
                    self.last_error = Some(ScanError::DecodeEngineFault(
                        "decode loop ended".to_string(),
                    ));
                    return;
                }
            }
        }
    }

    /// Release the camera and close the session.
    ///
    /// Idempotent and safe when the session was never opened.
    pub fn close(&mut self) {
        self.teardown();
        self.state = SessionState::Idle;
        self.already_reported = false;
        self.reported_values.clear();
        self.last_error = None;
        self.consecutive_faults = 0;

        if std::mem::replace(&mut self.open, false) {
            tracing::info!(session = self.id, "Scanner closed");
            self.host.on_close();
        }
    }

    /// Honour a host dismissal that arrived while nothing was driving
    /// [`run`](Self::run). Returns whether the session was closed.
    fn close_if_dismissed(&mut self) -> bool {
        if !self.open || !self.dismiss.is_dismissed() {
            return false;
        }
        tracing::info!(session = self.id, "Scanner dismissed by host");
        self.close();
        true
    }

    async fn acquire(&mut self) -> Result<(), ScanError> {
        self.state = SessionState::Acquiring;
        tracing::info!(
            session = self.id,
            provider = %self.provider.name(),
            facing = ?self.options.constraints.facing,
            "Requesting camera"
        );

        let stream = match self
            .provider
            .request_video_stream(&self.options.constraints)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session = self.id, error = %e, "Camera acquisition failed");
                let err = ScanError::from(e);
                self.state = SessionState::Idle;
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if self.dismiss.is_dismissed() || !self.open {
            tracing::info!(session = self.id, "Host closed while acquiring; releasing camera");
            stream.stop_all_tracks();
            self.close();
            return Ok(());
        }

        tracing::info!(
            session = self.id,
            stream = %stream.id(),
            camera = %stream.label(),
            "Camera acquired"
        );
        self.surface.bind(stream.clone());
        if !self.surface.play() {
            tracing::warn!(session = self.id, stream = %stream.id(), "Video playback did not start");
        }
        self.stream = Some(stream);

        match self.engine.start_decoding(&self.surface) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = SessionState::Streaming;
                tracing::info!(session = self.id, engine = %self.engine.name(), "Scanner streaming");
                Ok(())
            }
            Err(e) => {
                tracing::error!(session = self.id, error = %e, "Decode engine failed to start");
                self.teardown();
                self.state = SessionState::Idle;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Single emission path for camera and manual codes.
    async fn report(&mut self, value: String, source: ScanSource) -> bool {
        if self.options.policy == ScanPolicy::StayOpenDedupeByValue {
            if !self.reported_values.insert(value.clone()) {
                tracing::debug!(session = self.id, code = %value, "Duplicate code suppressed");
                return false;
            }
        } else if self.already_reported {
            tracing::debug!(session = self.id, code = %value, "Code already reported");
            return false;
        }
        // Latch before anything else so queued ticks cannot double-emit.
        self.already_reported = true;

        let was_streaming = self.state == SessionState::Streaming;
        self.state = SessionState::Reporting;
        if self.options.policy != ScanPolicy::StayOpenDedupeByValue {
            self.teardown();
        }

        tracing::info!(session = self.id, code = %value, ?source, "Code scanned");
        let code = ScannedCode { value, source };
        self.host.on_scanned(&code);
        self.decoded_value = Some(code.value);
        self.vibrate();

        match self.options.policy {
            ScanPolicy::CloseOnFirstScan => self.close(),
            ScanPolicy::StayOpenDedupeByValue => {
                self.state = if was_streaming {
                    SessionState::Streaming
                } else {
                    SessionState::Idle
                };
            }
            ScanPolicy::StayOpenAllowRepeats => {
                self.already_reported = false;
                self.state = SessionState::Idle;
                if was_streaming && self.open {
                    if let Err(e) = self.acquire().await {
                        tracing::warn!(session = self.id, error = %e, "Could not reacquire camera");
                    }
                }
            }
        }
        true
    }

    fn handle_fault(&mut self, message: String) {
        self.consecutive_faults += 1;
        tracing::warn!(
            session = self.id,
            error = %message,
            consecutive = self.consecutive_faults,
            "Decode engine fault"
        );

        if let DecodeFaultPolicy::StopAfterConsecutive(limit) = self.options.fault_policy {
            if limit > 0 && self.consecutive_faults >= limit && self.is_streaming() {
                tracing::error!(session = self.id, limit, "Decode engine keeps failing; stopping camera");
                self.teardown();
                self.state = SessionState::Idle;
                self.consecutive_faults = 0;
                self.last_error = Some(ScanError::DecodeEngineFault(message));
            }
        }
    }

    fn vibrate(&self) {
        if !self.options.haptics {
            return;
        }
        if let Some(haptics) = &self.haptics {
            haptics.vibrate(HAPTIC_PULSE);
        }
    }

    /// Cancel the decode loop, stop the stream, detach the surface.
    fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            tracing::debug!(session = self.id, "Decode loop cancelled");
        }
        if let Some(stream) = self.stream.take() {
            stream.stop_all_tracks();
            tracing::debug!(session = self.id, stream = %stream.id(), "Camera released");
        }
        self.surface.detach();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AcquireError, ErrorKind};
    use crate::scripted::{RecordingHost, ScriptedDecodeEngine, ScriptedProvider};

    struct Fixture {
        provider: Arc<ScriptedProvider>,
        engine: Arc<ScriptedDecodeEngine>,
        host: RecordingHost,
        session: CaptureSession,
    }

    fn fixture(policy: ScanPolicy, provider: ScriptedProvider, engine: ScriptedDecodeEngine) -> Fixture {
        let provider = Arc::new(provider);
        let engine = Arc::new(engine);
        let host = RecordingHost::new();
        let options = SessionOptions {
            policy,
            ..SessionOptions::default()
        };
        let session = CaptureSession::new(
            options,
            provider.clone(),
            engine.clone(),
            Box::new(host.clone()),
        );
        Fixture {
            provider,
            engine,
            host,
            session,
        }
    }

    fn decoded(code: &str) -> DecodeTick {
        DecodeTick::Decoded(code.to_string())
    }

    #[test]
    fn test_default_options_follow_scanner_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options, SessionOptions::from(&ScannerDefaults::default()));
        assert!(options.haptics);
        assert_eq!(options.policy, ScanPolicy::CloseOnFirstScan);
    }

    #[tokio::test]
    async fn test_open_streams_and_binds_surface() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();

        assert_eq!(f.session.state(), SessionState::Streaming);
        assert!(f.session.is_open());
        assert!(f.session.video_surface().is_playing());
        assert_eq!(f.provider.requests(), 1);
        assert_eq!(f.engine.loops_started(), 1);
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        assert_eq!(f.session.open().await, Err(ScanError::AlreadyStreaming));
        assert_eq!(f.provider.requests(), 1);
    }

    #[tokio::test]
    async fn test_first_decode_emits_once_and_closes() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        f.session.on_decode_tick(DecodeTick::NotFound).await;
        f.session.on_decode_tick(decoded("7501234567890")).await;
        f.session.on_decode_tick(decoded("7501234567890")).await;

        assert_eq!(f.host.values(), vec!["7501234567890".to_string()]);
        assert_eq!(f.host.closes(), 1);
        assert_eq!(f.session.state(), SessionState::Idle);
        assert!(!f.session.is_open());
        assert_eq!(f.session.decoded_value(), Some("7501234567890"));
        assert_eq!(f.provider.total_stops(), 1);
        assert_eq!(f.engine.loops_cancelled(), 1);
    }

    #[tokio::test]
    async fn test_close_when_idle_is_noop() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.close();
        f.session.close();
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.host.closes(), 0);
        assert_eq!(f.provider.total_stops(), 0);
    }

    #[tokio::test]
    async fn test_double_close_releases_once() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        f.session.close();
        f.session.close();

        assert_eq!(f.provider.total_stops(), 1);
        assert_eq!(f.provider.double_stops(), 0);
        assert_eq!(f.engine.loops_cancelled(), 1);
        assert_eq!(f.host.closes(), 1);
        assert!(!f.session.video_surface().is_bound());
    }

    #[tokio::test]
    async fn test_reopen_can_emit_same_code_again() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        f.session.on_decode_tick(decoded("ABC-1")).await;
        assert!(!f.session.already_reported());

        f.session.open().await.unwrap();
        f.session.on_decode_tick(decoded("ABC-1")).await;
        assert_eq!(f.host.values(), vec!["ABC-1".to_string(), "ABC-1".to_string()]);
    }

    #[tokio::test]
    async fn test_whitespace_manual_entry_is_rejected() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        assert_eq!(
            f.session.manual_entry("   ").await,
            Err(ScanError::InvalidManualInput)
        );
        assert!(f.host.values().is_empty());
        assert!(f.session.is_streaming());
    }

    #[tokio::test]
    async fn test_manual_entry_uses_camera_teardown_path() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        assert_eq!(f.session.manual_entry(" 12345 ").await, Ok(true));

        assert_eq!(f.host.values(), vec!["12345".to_string()]);
        assert_eq!(f.host.scanned()[0].source, ScanSource::Manual);
        assert_eq!(f.provider.total_stops(), 1);
        assert_eq!(f.engine.loops_cancelled(), 1);
        assert_eq!(f.host.closes(), 1);
        assert_eq!(f.session.manual_entry("12345").await, Err(ScanError::NotOpen));
    }

    #[tokio::test]
    async fn test_permission_denied_keeps_manual_path() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::failing(AcquireError::PermissionDenied("blocked".into())),
            ScriptedDecodeEngine::idle(),
        );
        let err = f.session.open().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        assert!(!f.session.is_streaming());
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.session.last_error(), Some(&err));
        assert!(f.session.is_open());
        assert_eq!(f.engine.loops_started(), 0);

        assert_eq!(f.session.manual_entry("555").await, Ok(true));
        assert_eq!(f.host.values(), vec!["555".to_string()]);
        assert_eq!(f.host.closes(), 1);
    }

    #[tokio::test]
    async fn test_dismissal_while_idle_blocks_manual_entry() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::failing(AcquireError::PermissionDenied("blocked".into())),
            ScriptedDecodeEngine::idle(),
        );
        assert!(f.session.open().await.is_err());
        f.session.dismiss_handle().dismiss();

        assert_eq!(f.session.manual_entry("12345").await, Err(ScanError::NotOpen));
        assert!(f.host.values().is_empty());
        assert_eq!(f.host.closes(), 1);
        assert!(!f.session.is_open());
        assert_eq!(f.session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_reopen_after_idle_dismissal_starts_fresh() {
        let provider = ScriptedProvider::new();
        provider.fail_next(AcquireError::NoDevice("unplugged".into()));
        let mut f = fixture(ScanPolicy::CloseOnFirstScan, provider, ScriptedDecodeEngine::idle());

        assert!(f.session.open().await.is_err());
        f.session.dismiss_handle().dismiss();

        f.session.open().await.unwrap();
        assert_eq!(f.host.closes(), 1);
        assert!(f.session.is_streaming());
        assert!(!f.session.dismiss_handle().is_dismissed());

        f.session.on_decode_tick(decoded("42")).await;
        assert_eq!(f.host.values(), vec!["42".to_string()]);
    }

    #[tokio::test]
    async fn test_decode_after_dismissal_is_not_reported() {
        let mut f = fixture(
            ScanPolicy::StayOpenDedupeByValue,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        f.session.dismiss_handle().dismiss();
        f.session.on_decode_tick(decoded("A")).await;

        assert!(f.host.values().is_empty());
        assert_eq!(f.host.closes(), 1);
        assert_eq!(f.provider.live_streams(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_failure_clears_error() {
        let provider = ScriptedProvider::new();
        provider.fail_next(AcquireError::NoDevice("unplugged".into()));
        let mut f = fixture(ScanPolicy::CloseOnFirstScan, provider, ScriptedDecodeEngine::idle());

        assert!(f.session.open().await.is_err());
        assert!(f.session.last_error().is_some());

        f.session.open().await.unwrap();
        assert!(f.session.last_error().is_none());
        assert!(f.session.is_streaming());
        assert_eq!(f.provider.requests(), 2);
    }

    #[tokio::test]
    async fn test_dedupe_policy_keeps_streaming() {
        let mut f = fixture(
            ScanPolicy::StayOpenDedupeByValue,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        for code in ["A", "A", "B", "A", "B", "C"] {
            f.session.on_decode_tick(decoded(code)).await;
        }

        assert_eq!(f.host.values(), vec!["A", "B", "C"]);
        assert!(f.session.is_streaming());
        assert_eq!(f.provider.total_stops(), 0);
        assert_eq!(f.session.manual_entry("B").await, Ok(false));

        f.session.close();
        assert_eq!(f.provider.total_stops(), 1);
        f.session.open().await.unwrap();
        f.session.on_decode_tick(decoded("A")).await;
        assert_eq!(f.host.values(), vec!["A", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_allow_repeats_reacquires_camera() {
        let mut f = fixture(
            ScanPolicy::StayOpenAllowRepeats,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        f.session.on_decode_tick(decoded("X")).await;
        f.session.on_decode_tick(decoded("X")).await;

        assert_eq!(f.host.values(), vec!["X", "X"]);
        assert!(f.session.is_streaming());
        assert!(f.session.is_open());
        assert_eq!(f.provider.requests(), 3);
        assert_eq!(f.engine.loops_started(), 3);
        assert_eq!(f.engine.loops_cancelled(), 2);
        assert_eq!(f.host.closes(), 0);
    }

    #[tokio::test]
    async fn test_fault_policy_stops_after_limit() {
        let provider = Arc::new(ScriptedProvider::new());
        let engine = Arc::new(ScriptedDecodeEngine::idle());
        let host = RecordingHost::new();
        let options = SessionOptions {
            fault_policy: DecodeFaultPolicy::StopAfterConsecutive(3),
            ..SessionOptions::default()
        };
        let mut session =
            CaptureSession::new(options, provider.clone(), engine.clone(), Box::new(host.clone()));

        session.open().await.unwrap();
        session.on_decode_tick(DecodeTick::Fault("checksum".into())).await;
        session.on_decode_tick(DecodeTick::Fault("checksum".into())).await;
        session.on_decode_tick(DecodeTick::NotFound).await;
        session.on_decode_tick(DecodeTick::Fault("checksum".into())).await;
        session.on_decode_tick(DecodeTick::Fault("checksum".into())).await;
        assert!(session.is_streaming());

        session.on_decode_tick(DecodeTick::Fault("format".into())).await;
        assert!(!session.is_streaming());
        assert_eq!(
            session.last_error().map(ScanError::kind),
            Some(ErrorKind::DecodeEngineFault)
        );
        assert_eq!(provider.total_stops(), 1);
        assert_eq!(session.manual_entry("99").await, Ok(true));
    }

    #[tokio::test]
    async fn test_faults_are_logged_and_ignored_by_default() {
        let mut f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        f.session.open().await.unwrap();
        for _ in 0..50 {
            f.session.on_decode_tick(DecodeTick::Fault("format".into())).await;
        }
        assert!(f.session.is_streaming());
        assert!(f.session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_camera() {
        let f = fixture(
            ScanPolicy::CloseOnFirstScan,
            ScriptedProvider::new(),
            ScriptedDecodeEngine::idle(),
        );
        let Fixture {
            provider,
            engine,
            mut session,
            ..
        } = f;
        session.open().await.unwrap();
        drop(session);
        assert_eq!(provider.total_stops(), 1);
        assert_eq!(engine.loops_cancelled(), 1);
    }
}
