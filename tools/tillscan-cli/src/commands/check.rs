//! Show the effective configuration and validate input paths.

use std::path::{Path, PathBuf};

use tillscan_capture::frames::list_frames;
use tillscan_common::config::{config_file_path, AppConfig};
use tillscan_common::error::{TillscanError, TillscanResult};
use tillscan_sale::InMemoryCatalog;

pub fn run(
    config: &AppConfig,
    frames: Option<PathBuf>,
    catalog: Option<PathBuf>,
    write_config: bool,
) -> anyhow::Result<()> {
    println!("Tillscan Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config file: {}", path.display());
    } else {
        println!("[--] Config file: {} (using defaults)", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    if write_config {
        save_config(config, &path)?;
        println!("[OK] Wrote configuration to {}", path.display());
    }
    println!();

    let mut problems = 0;

    if let Some(dir) = frames {
        match list_frames(&dir) {
            Ok(found) => println!("[OK] Frames: {} image(s) in {}", found.len(), dir.display()),
            Err(e) => {
                problems += 1;
                println!("[FAIL] Frames: {e}");
                println!("       {}", e.user_message());
            }
        }
    }

    if let Some(file) = catalog {
        match InMemoryCatalog::load(&file) {
            Ok(catalog) => {
                let snapshot = catalog.snapshot();
                println!(
                    "[OK] Catalog: {} store(s), {} product(s), {} sale(s)",
                    snapshot.stores.len(),
                    snapshot.products.len(),
                    snapshot.sales.len()
                );
                for product in snapshot.products.iter().filter(|p| p.is_active) {
                    let status = product.stock_status();
                    if status.needs_attention() {
                        println!(
                            "     {:?}: {} ({} left, minimum {})",
                            status, product.name, product.stock_quantity, product.min_stock
                        );
                    }
                }
            }
            Err(e) => {
                problems += 1;
                println!("[FAIL] Catalog: {e}");
            }
        }
    }

    println!();
    if problems == 0 {
        println!("Everything checked is usable.");
    } else {
        println!("{problems} problem(s) found. See above.");
    }

    Ok(())
}

fn save_config(config: &AppConfig, path: &Path) -> TillscanResult<()> {
    config
        .save_to(path)
        .map_err(|e| TillscanError::config(format!("cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillscan_capture::ScanPolicy;

    #[test]
    fn test_save_config_writes_loadable_file() {
        let dir = std::env::temp_dir().join(format!("tillscan-check-{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = AppConfig::default();
        config.scanner.policy = ScanPolicy::StayOpenAllowRepeats;

        save_config(&config, &path).unwrap();
        assert_eq!(
            AppConfig::load_from(&path).scanner.policy,
            ScanPolicy::StayOpenAllowRepeats
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_config_failure_is_a_config_error() {
        let blocker = std::env::temp_dir().join(format!("tillscan-check-file-{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = save_config(&AppConfig::default(), &blocker.join("config.json")).unwrap_err();
        assert!(matches!(err, TillscanError::Config { .. }));
        let _ = std::fs::remove_file(&blocker);
    }
}
