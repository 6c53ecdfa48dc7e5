//! Run one capture session and print the codes it reports.

use tillscan_capture::{ScanHost, ScannedCode};
use tillscan_common::config::AppConfig;

use super::camera::{self, Camera};
use crate::SourceArgs;

/// Host that prints every code to stdout.
struct PrintingHost {
    json: bool,
}

impl ScanHost for PrintingHost {
    fn on_scanned(&mut self, code: &ScannedCode) {
        if self.json {
            match serde_json::to_string(code) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "Failed to encode scanned code"),
            }
        } else {
            println!("{}", code.value);
        }
    }

    fn on_close(&mut self) {
        tracing::debug!("Scanner closed");
    }
}

pub async fn run(config: &AppConfig, source: SourceArgs, json: bool) -> anyhow::Result<()> {
    let camera = Camera::from_args(config, &source)?
        .ok_or_else(|| anyhow::anyhow!("Give a camera source with --script or --frames"))?;

    tracing::info!(policy = ?camera.options.policy, "Starting scanner");
    let mut session = camera.session(Box::new(PrintingHost { json }));

    match camera::drive(&mut session, source.timeout).await {
        Ok(()) => Ok(()),
        Err(e) if camera.finite && e.kind() == tillscan_capture::ErrorKind::DecodeEngineFault => {
            tracing::debug!("Tick script finished");
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e.user_message()),
    }
}
