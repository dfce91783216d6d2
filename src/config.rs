//! Runner configuration loaded from `doodle.toml`
//!
//! Every key is optional; a missing file yields the defaults.

use crate::display_manager::{DisplayMode, DisplaySettings};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "doodle.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u16,
    pub height: u16,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "doodle".to_string(),
            width: 200,
            height: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Function the program starts in
    pub entry: String,
    pub display: DisplayMode,
    pub log_display_ops: bool,
    pub max_steps: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            entry: "main".to_string(),
            display: DisplayMode::Auto,
            log_display_ops: false,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DoodleConfig {
    pub window: WindowConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String, std::io::Error),
    Parse(String, toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Cannot read config {}: {}", path, e),
            ConfigError::Parse(path, e) => write!(f, "Invalid config {}: {}", path, e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl DoodleConfig {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load `path`, or `doodle.toml` in the working directory when no path
    /// is given. Only an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        let name = path.display().to_string();

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} found, using defaults", name);
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(name, e)),
        };

        let config = Self::from_toml(&source).map_err(|e| ConfigError::Parse(name.clone(), e))?;
        debug!("Loaded config from {}: {:?}", name, config);
        Ok(config)
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            mode: self.runtime.display,
            title: self.window.title.clone(),
            width: self.window.width,
            height: self.window.height,
            log_ops: self.runtime.log_display_ops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(DoodleConfig::from_toml("").unwrap(), DoodleConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = DoodleConfig::from_toml(
            r#"
            [window]
            title = "pong"

            [runtime]
            display = "headless"
            max_steps = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "pong");
        assert_eq!(config.window.width, 200);
        assert_eq!(config.runtime.entry, "main");
        assert_eq!(config.runtime.display, DisplayMode::Headless);
        assert_eq!(config.runtime.max_steps, Some(5000));
    }

    #[test]
    fn test_unknown_display_mode_rejected() {
        assert!(DoodleConfig::from_toml("[runtime]\ndisplay = \"opengl\"").is_err());
    }

    #[test]
    fn test_missing_named_file_is_error() {
        let missing = Path::new("/nonexistent/doodle-config.toml");
        assert!(matches!(
            DoodleConfig::load(Some(missing)),
            Err(ConfigError::Io(..))
        ));
    }
}
