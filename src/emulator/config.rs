// Configuration management
//
// Handles emulator configuration and settings persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::debug::LogLevel;

/// Default configuration file path
const CONFIG_FILE: &str = "emulator_config.toml";

/// Errors while loading or saving the configuration
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error
    Io(io::Error),

    /// TOML parse error
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Emulator configuration
///
/// Stores all user-configurable settings for the emulator core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Drive settings
    pub drive: DriveConfig,

    /// Snapshot settings
    pub snapshot: SnapshotConfig,

    /// Screenshot settings
    pub screenshot: ScreenshotConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// 1541 drive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Path to the 16KB floppy ROM image
    pub rom_path: PathBuf,

    /// Run the firmware's own disk-controller routine instead of the
    /// native job dispatcher
    pub controller_emulation: bool,
}

/// Snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Number of snapshot slots (1-10)
    pub slots: u8,

    /// Snapshot directory
    pub directory: PathBuf,
}

/// Screenshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Screenshot directory
    pub directory: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level name: "none", "error", "warning", "info", "debug", "trace"
    pub level: String,

    /// Enable C64 CPU trace logging
    pub trace_cpu: bool,

    /// Enable drive trace logging
    pub trace_drive: bool,

    /// Optional log file
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Parse the configured level name (unknown names fall back to Info)
    pub fn level(&self) -> LogLevel {
        match self.level.to_ascii_lowercase().as_str() {
            "none" => LogLevel::None,
            "error" => LogLevel::Error,
            "warning" => LogLevel::Warning,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            drive: DriveConfig {
                rom_path: PathBuf::from(crate::drive::FLOPPY_ROM_RESOURCE),
                controller_emulation: false,
            },
            snapshot: SnapshotConfig {
                slots: 10,
                directory: PathBuf::from("snapshots"),
            },
            screenshot: ScreenshotConfig {
                directory: PathBuf::from("screenshots"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                trace_cpu: false,
                trace_drive: false,
                file: None,
            },
        }
    }
}

impl EmulatorConfig {
    /// Load the configuration from the default file, falling back to
    /// defaults if the file is missing or unreadable
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load the configuration from the default file
    pub fn load() -> Result<Self, ConfigError> {
        let text = fs::read_to_string(CONFIG_FILE)?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save the configuration to the default file
    pub fn save(&self) -> Result<(), ConfigError> {
        let text =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(CONFIG_FILE, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmulatorConfig::default();
        assert!(!config.drive.controller_emulation);
        assert_eq!(config.snapshot.slots, 10);
        assert_eq!(config.logging.level(), LogLevel::Info);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = EmulatorConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: EmulatorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.snapshot.slots, config.snapshot.slots);
        assert_eq!(parsed.drive.rom_path, config.drive.rom_path);
    }

    #[test]
    fn test_log_level_parsing() {
        let mut logging = EmulatorConfig::default().logging;
        logging.level = "trace".to_string();
        assert_eq!(logging.level(), LogLevel::Trace);

        logging.level = "bogus".to_string();
        assert_eq!(logging.level(), LogLevel::Info, "Unknown names fall back");
    }
}
