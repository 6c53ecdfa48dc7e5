//! QR decode engine.
//!
//! Grabs frames from the bound stream at a fixed rate and runs `rqrr` on a
//! blocking task. Every attempt produces exactly one tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::decode::{DecodeEngine, DecodeSubscription, DecodeTick};
use crate::device::{Frame, MediaStream};
use crate::error::ScanError;
use crate::surface::VideoSurface;

/// Decode engine reading QR codes from live frames.
pub struct QrDecodeEngine {
    frame_interval: Duration,
}

impl Default for QrDecodeEngine {
    fn default() -> Self {
        Self::new(15)
    }
}

impl QrDecodeEngine {
    /// Create an engine attempting `fps` decodes per second.
    pub fn new(fps: u32) -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl DecodeEngine for QrDecodeEngine {
    fn start_decoding(&self, surface: &VideoSurface) -> Result<DecodeSubscription, ScanError> {
        let stream = surface.stream().ok_or_else(|| {
            ScanError::DecodeEngineFault("no stream bound to the video surface".to_string())
        })?;
        let (tx, cancel, subscription) = DecodeSubscription::channel();
        let frame_interval = self.frame_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut attempts: u64 = 0;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let frame_stream = stream.clone();
                let tick = match tokio::task::spawn_blocking(move || grab_and_decode(&*frame_stream)).await {
                    Ok(Some(tick)) => tick,
                    Ok(None) => {
                        tracing::debug!(stream = %stream.id(), "Stream ended; stopping decode loop");
                        break;
                    }
                    Err(e) => DecodeTick::Fault(format!("decode task failed: {e}")),
                };
                attempts += 1;

                if cancel.is_cancelled() || tx.send(tick).await.is_err() {
                    break;
                }
            }
            tracing::debug!(attempts, "QR decode loop finished");
        });

        Ok(subscription)
    }

    fn name(&self) -> &str {
        "rqrr"
    }
}

fn grab_and_decode(stream: &dyn MediaStream) -> Option<DecodeTick> {
    Some(match stream.read_frame()? {
        Ok(frame) => decode_frame(&frame),
        Err(e) => DecodeTick::Fault(e),
    })
}

/// Decode the first readable QR code in `frame`.
///
/// A frame with no grid is a miss. A grid that fails to decode is a fault,
/// usually a partially visible or blurred code.
pub fn decode_frame(frame: &Frame) -> DecodeTick {
    if frame.width == 0 || frame.height == 0 {
        return DecodeTick::Fault("empty frame".to_string());
    }

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        frame.width as usize,
        frame.height as usize,
        |x, y| frame.pixel(x, y),
    );
    let grids = prepared.detect_grids();
    if grids.is_empty() {
        return DecodeTick::NotFound;
    }

    let mut last_error = None;
    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => {
                tracing::debug!(content = %content, "Decoded QR code");
                return DecodeTick::Decoded(content);
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    DecodeTick::Fault(last_error.unwrap_or_else(|| "undecodable grid".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedStream;

    #[test]
    fn test_blank_frame_is_a_miss() {
        let frame = Frame::from_luma(64, 64, vec![255; 64 * 64]).unwrap();
        assert_eq!(decode_frame(&frame), DecodeTick::NotFound);
    }

    #[test]
    fn test_empty_frame_is_a_fault() {
        let frame = Frame::from_luma(0, 0, Vec::new()).unwrap();
        assert!(matches!(decode_frame(&frame), DecodeTick::Fault(_)));
    }

    #[test]
    fn test_frame_rate_sets_interval() {
        assert_eq!(QrDecodeEngine::new(20).frame_interval(), Duration::from_millis(50));
        assert_eq!(QrDecodeEngine::new(0).frame_interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_loop_reports_misses_until_cancelled() {
        let stream = Arc::new(ScriptedStream::new("cam"));
        let mut surface = VideoSurface::new();
        surface.bind(stream.clone());

        let engine = QrDecodeEngine::new(200);
        let mut sub = engine.start_decoding(&surface).unwrap();
        assert_eq!(sub.next_tick().await, Some(DecodeTick::NotFound));

        sub.cancel();
        assert_eq!(sub.next_tick().await, None);
    }

    #[tokio::test]
    async fn test_loop_ends_with_stream() {
        let stream = Arc::new(ScriptedStream::new("cam"));
        let mut surface = VideoSurface::new();
        surface.bind(stream.clone());
        stream.stop_all_tracks();

        let engine = QrDecodeEngine::new(200);
        let mut sub = engine.start_decoding(&surface).unwrap();
        let ended = tokio::time::timeout(Duration::from_secs(2), sub.next_tick())
            .await
            .expect("loop should finish");
        assert_eq!(ended, None);
    }
}
