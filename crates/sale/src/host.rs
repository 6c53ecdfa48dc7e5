//! Bridge from a capture session to a sale draft.

use tillscan_capture::{ScanHost, ScannedCode};
use tokio::sync::mpsc;

use crate::catalog::ProductCatalog;
use crate::draft::{LineAdded, SaleDraft, SaleError};

/// What a capture session told the sale screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Scanned(ScannedCode),
    Closed,
}

/// [`ScanHost`] that forwards session output over a channel, so the sale
/// screen can resolve codes against the catalog without blocking the
/// session.
#[derive(Debug, Clone)]
pub struct SaleScanHost {
    tx: mpsc::UnboundedSender<ScanEvent>,
}

impl SaleScanHost {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ScanHost for SaleScanHost {
    fn on_scanned(&mut self, code: &ScannedCode) {
        if self.tx.send(ScanEvent::Scanned(code.clone())).is_err() {
            tracing::debug!(value = %code.value, "Sale screen gone; dropping scan");
        }
    }

    fn on_close(&mut self) {
        let _ = self.tx.send(ScanEvent::Closed);
    }
}

/// Outcome of one forwarded scan.
#[derive(Debug)]
pub struct AppliedScan {
    pub code: ScannedCode,
    pub result: Result<LineAdded, SaleError>,
}

/// Add every forwarded code to `draft` until the session closes or the
/// host is dropped.
///
/// Lookup failures are returned per code; they never stop the feed.
pub async fn apply_scans(
    draft: &mut SaleDraft,
    catalog: &dyn ProductCatalog,
    events: &mut mpsc::UnboundedReceiver<ScanEvent>,
) -> Vec<AppliedScan> {
    let mut applied = Vec::new();
    while let Some(event) = events.recv().await {
        let code = match event {
            ScanEvent::Scanned(code) => code,
            ScanEvent::Closed => break,
        };
        let result = draft.add_identifier(catalog, &code.value).await;
        if let Err(e) = &result {
            tracing::warn!(value = %code.value, source = ?code.source, error = %e, "Scan not added");
        }
        applied.push(AppliedScan { code, result });
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillscan_capture::ScanSource;

    #[test]
    fn test_forwards_scans_then_close() {
        let (mut host, mut rx) = SaleScanHost::channel();
        let code = ScannedCode {
            value: "111".to_string(),
            source: ScanSource::Manual,
        };
        host.on_scanned(&code);
        host.on_close();

        assert_eq!(rx.try_recv().unwrap(), ScanEvent::Scanned(code));
        assert_eq!(rx.try_recv().unwrap(), ScanEvent::Closed);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (mut host, rx) = SaleScanHost::channel();
        drop(rx);
        host.on_scanned(&ScannedCode {
            value: "x".to_string(),
            source: ScanSource::Camera,
        });
        host.on_close();
    }
}
