//! Build the camera and decode engine a command scans with.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tillscan_capture::scripted::{parse_tick_script, ScriptedDecodeEngine, ScriptedProvider};
use tillscan_capture::{
    AcquireError, CaptureSession, DecodeEngine, DecodeTick, FrameDirectoryProvider, MediaProvider,
    QrDecodeEngine, ScanError, ScanHost, ScanPolicy, SessionOptions,
};
use tillscan_common::config::AppConfig;

use crate::SourceArgs;

/// A camera ready to be handed to a capture session.
pub struct Camera {
    pub provider: Arc<dyn MediaProvider>,
    pub engine: Arc<dyn DecodeEngine>,
    pub options: SessionOptions,
    /// Whether the decode loop stops by itself once its input runs out.
    pub finite: bool,
}

impl Camera {
    /// Camera for the given source flags, or `None` when neither a script
    /// nor a frame directory was given.
    pub fn from_args(config: &AppConfig, source: &SourceArgs) -> anyhow::Result<Option<Self>> {
        let mut options = SessionOptions::from(&config.scanner);
        if let Some(policy) = source.policy {
            options.policy = policy;
        }

        if let Some(path) = &source.script {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read tick script {}", path.display()))?;
            let ticks = parse_tick_script(&text)
                .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
            let runs = script_runs(ticks, options.policy);
            tracing::debug!(path = %path.display(), runs = runs.len(), "Loaded tick script");
            return Ok(Some(Self {
                provider: Arc::new(ScriptedProvider::new()),
                engine: Arc::new(ScriptedDecodeEngine::with_runs(runs).ending_after_script()),
                options,
                finite: true,
            }));
        }

        if let Some(dir) = &source.frames {
            let fps = source.fps.unwrap_or(config.scanner.decode_fps);
            return Ok(Some(Self {
                provider: Arc::new(FrameDirectoryProvider::new(dir.clone())),
                engine: Arc::new(QrDecodeEngine::new(fps)),
                options,
                finite: false,
            }));
        }

        Ok(None)
    }

    /// A camera that is never available, leaving only manual entry.
    pub fn manual_only(config: &AppConfig) -> Self {
        let mut options = SessionOptions::from(&config.scanner);
        options.policy = ScanPolicy::StayOpenAllowRepeats;
        Self {
            provider: Arc::new(ScriptedProvider::failing(AcquireError::NoDevice(
                "no camera source given".to_string(),
            ))),
            engine: Arc::new(ScriptedDecodeEngine::idle()),
            options,
            finite: true,
        }
    }

    pub fn session(&self, host: Box<dyn ScanHost>) -> CaptureSession {
        CaptureSession::new(self.options, self.provider.clone(), self.engine.clone(), host)
    }
}

/// Split a script into one decode loop per item.
///
/// Outside the repeat policy the whole script is a single loop. Under it the
/// camera is reacquired after every report, so each group of back-to-back
/// consecutive codes ends a loop.
fn script_runs(ticks: Vec<DecodeTick>, policy: ScanPolicy) -> Vec<Vec<DecodeTick>> {
    if policy != ScanPolicy::StayOpenAllowRepeats {
        return vec![ticks];
    }

    let mut runs = Vec::new();
    let mut current = Vec::new();
    let mut ticks = ticks.into_iter().peekable();
    while let Some(tick) = ticks.next() {
        let ends_item = matches!(tick, DecodeTick::Decoded(_))
            && !matches!(ticks.peek(), Some(DecodeTick::Decoded(_)));
        current.push(tick);
        if ends_item {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Open `session`, run it until it stops, and close it.
///
/// Ctrl+C or `timeout` dismisses the scanner. The session is always closed on
/// return, so the host always sees `on_close`.
pub async fn drive(session: &mut CaptureSession, timeout: Option<u64>) -> Result<(), ScanError> {
    if let Err(e) = session.open().await {
        session.close();
        return Err(e);
    }

    let dismiss = session.dismiss_handle();
    let watcher = tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
            _ = deadline => tracing::info!(secs = ?timeout, "Scan time limit reached"),
        }
        dismiss.dismiss();
    });

    session.run().await;
    watcher.abort();

    let result = match session.last_error() {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    };
    session.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(v: &str) -> DecodeTick {
        DecodeTick::Decoded(v.to_string())
    }

    #[test]
    fn test_single_run_outside_repeat_policy() {
        let ticks = vec![DecodeTick::NotFound, code("1"), code("2")];
        let runs = script_runs(ticks.clone(), ScanPolicy::StayOpenDedupeByValue);
        assert_eq!(runs, vec![ticks]);
    }

    #[test]
    fn test_repeat_policy_splits_per_item() {
        let ticks = vec![
            DecodeTick::NotFound,
            code("1"),
            code("1"),
            DecodeTick::NotFound,
            code("1"),
            code("2"),
            DecodeTick::NotFound,
        ];
        let runs = script_runs(ticks, ScanPolicy::StayOpenAllowRepeats);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], vec![DecodeTick::NotFound, code("1"), code("1")]);
        assert_eq!(runs[1], vec![DecodeTick::NotFound, code("1"), code("2")]);
        assert_eq!(runs[2], vec![DecodeTick::NotFound]);
    }
}
