use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::collector::Strategy;
use crate::system::filter::DEFAULT_APP_PREFIX;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub sampling: SamplingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub adb_path: PathBuf,
    pub command_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            adb_path: PathBuf::from("./adb.exe"),
            command_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub strategy: Strategy,
    pub app_prefix: String,
    pub top_iterations: u32,
    pub top_delay_secs: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            strategy: Strategy::Proc,
            app_prefix: DEFAULT_APP_PREFIX.to_string(),
            top_iterations: 2,
            top_delay_secs: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("droidmon").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.device.adb_path, PathBuf::from("./adb.exe"));
        assert_eq!(config.device.command_timeout_secs, 10);
        assert_eq!(config.sampling.strategy, Strategy::Proc);
        assert_eq!(config.sampling.app_prefix, "com.");
        assert_eq!(config.sampling.top_iterations, 2);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert!(!config.logging.json);
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[device]
adb_path = "/opt/platform-tools/adb"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.adb_path, PathBuf::from("/opt/platform-tools/adb"));
        // Other fields should be defaults
        assert_eq!(config.device.command_timeout_secs, 10);
        assert_eq!(config.sampling.strategy, Strategy::Proc);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[device]
adb_path = "adb"
command_timeout_secs = 3

[sampling]
strategy = "top"
app_prefix = "org."
top_iterations = 3
top_delay_secs = 2

[logging]
level = "debug"
file = "logs/droidmon.log"
json = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.command_timeout_secs, 3);
        assert_eq!(config.sampling.strategy, Strategy::Top);
        assert_eq!(config.sampling.app_prefix, "org.");
        assert_eq!(config.sampling.top_iterations, 3);
        assert_eq!(config.sampling.top_delay_secs, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("logs/droidmon.log"))
        );
        assert!(config.logging.json);
    }

    #[test]
    fn unknown_strategy_falls_back_to_default() {
        let temp = std::env::temp_dir().join("droidmon_test_bad_strategy.toml");
        std::fs::write(&temp, "[sampling]\nstrategy = \"ps\"\n").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.sampling.strategy, Strategy::Proc);
        let _ = std::fs::remove_file(&temp);
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.device.command_timeout_secs, 10);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("droidmon_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.sampling.app_prefix, "com.");
        let _ = std::fs::remove_file(&temp);
    }
}
