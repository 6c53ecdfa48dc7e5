//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default scanner settings.
    #[serde(default)]
    pub scanner: ScannerDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What a capture session does after it has reported a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// Emit one code, then tear everything down and close.
    #[default]
    CloseOnFirstScan,
    /// Keep the camera running and emit each distinct code once per open period.
    StayOpenDedupeByValue,
    /// Release the camera after each code, then reacquire it for the next item.
    StayOpenAllowRepeats,
}

impl ScanPolicy {
    /// Whether the session stays open after reporting a code.
    pub fn stays_open(self) -> bool {
        !matches!(self, Self::CloseOnFirstScan)
    }
}

impl std::str::FromStr for ScanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "close-on-first-scan" | "single" => Ok(Self::CloseOnFirstScan),
            "stay-open-dedupe-by-value" | "dedupe" => Ok(Self::StayOpenDedupeByValue),
            "stay-open-allow-repeats" | "repeat" => Ok(Self::StayOpenAllowRepeats),
            other => Err(format!(
                "unknown scan policy '{other}' (expected single|dedupe|repeat)"
            )),
        }
    }
}

/// Which camera the media provider should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacingMode {
    /// Rear camera, pointing away from the operator.
    #[default]
    Environment,
    /// Front camera, pointing at the operator.
    User,
}

/// How a capture session treats decode errors other than "nothing in frame".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "limit")]
pub enum DecodeFaultPolicy {
    /// Log every fault and keep the decode loop running.
    #[default]
    LogAndContinue,
    /// Tear the stream down after this many faults in a row.
    StopAfterConsecutive(u32),
}

/// Default scanner parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerDefaults {
    /// Behaviour after a successful scan.
    pub policy: ScanPolicy,

    /// Preferred camera.
    pub facing: FacingMode,

    /// Ideal capture width.
    pub ideal_width: u32,

    /// Ideal capture height.
    pub ideal_height: u32,

    /// Decode attempts per second.
    pub decode_fps: u32,

    /// Treatment of decode engine faults.
    pub fault_policy: DecodeFaultPolicy,

    /// Vibrate on a successful scan when the platform supports it.
    pub haptics: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tillscan_capture=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ScannerDefaults {
    fn default() -> Self {
        Self {
            policy: ScanPolicy::default(),
            facing: FacingMode::default(),
            ideal_width: 1280,
            ideal_height: 720,
            decode_fps: 15,
            fault_policy: DecodeFaultPolicy::default(),
            haptics: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("tillscan").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tillscan-config-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[test]
    fn test_defaults_match_scanner_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.policy, ScanPolicy::CloseOnFirstScan);
        assert_eq!(config.scanner.facing, FacingMode::Environment);
        assert_eq!(
            (config.scanner.ideal_width, config.scanner.ideal_height),
            (1280, 720)
        );
        assert_eq!(config.scanner.fault_policy, DecodeFaultPolicy::LogAndContinue);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("roundtrip");
        let mut config = AppConfig::default();
        config.scanner.policy = ScanPolicy::StayOpenDedupeByValue;
        config.scanner.fault_policy = DecodeFaultPolicy::StopAfterConsecutive(5);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.scanner.policy, ScanPolicy::StayOpenDedupeByValue);
        assert_eq!(
            loaded.scanner.fault_policy,
            DecodeFaultPolicy::StopAfterConsecutive(5)
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let path = scratch_path("broken");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.scanner.decode_fps, 15);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_missing_sections() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "logging": { "level": "debug", "json": true } }"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.scanner.haptics);
    }

    #[test]
    fn test_partial_scanner_section_keeps_given_keys() {
        let path = scratch_path("partial-scanner");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"scanner":{"policy":"stay-open-dedupe-by-value"},"logging":{"level":"debug","json":true}}"#,
        )
        .unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.scanner.policy, ScanPolicy::StayOpenDedupeByValue);
        assert_eq!(loaded.scanner.decode_fps, 15);
        assert!(loaded.scanner.haptics);
        assert_eq!(loaded.logging.level, "debug");
        assert!(loaded.logging.json);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_logging_section_keeps_given_keys() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "logging": { "json": true } }"#).unwrap();
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_policy_parse_aliases() {
        assert_eq!("single".parse::<ScanPolicy>(), Ok(ScanPolicy::CloseOnFirstScan));
        assert_eq!(
            "dedupe".parse::<ScanPolicy>(),
            Ok(ScanPolicy::StayOpenDedupeByValue)
        );
        assert_eq!(
            "stay-open-allow-repeats".parse::<ScanPolicy>(),
            Ok(ScanPolicy::StayOpenAllowRepeats)
        );
        assert!("forever".parse::<ScanPolicy>().is_err());
        assert!(!ScanPolicy::CloseOnFirstScan.stays_open());
    }
}
