use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::ConversionOptions;
use crate::application::mapper::{DEFAULT_BOUNDARY_TYPE, MapperOptions};

pub const CONFIG_PATH_ENV: &str = "DRAWIO_THREAGILE_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "drawio-threagile.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub validate_input: bool,
    pub validate_output: bool,
    /// TOML threat catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
    pub default_boundary_type: String,
    /// Write a Markdown threat report next to the YAML output.
    pub write_report: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
            catalog_path: None,
            default_boundary_type: DEFAULT_BOUNDARY_TYPE.to_string(),
            write_report: false,
        }
    }
}

impl AppConfig {
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            validate_input: self.validate_input,
            validate_output: self.validate_output,
            mapper: MapperOptions {
                default_boundary_type: self.default_boundary_type.clone(),
            },
        }
    }
}

/// Load the configuration.
///
/// An explicit path must exist. Otherwise the path comes from
/// `DRAWIO_THREAGILE_CONFIG_PATH` or `./drawio-threagile.toml`, and a missing
/// file yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let path = config_path();
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    read_config(&path)
}

pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("serialize config")?;
    std::fs::write(path, contents).with_context(|| format!("write config {}", path.display()))
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("parse config {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: AppConfig = toml::from_str("write_report = true").unwrap();
        assert!(config.write_report);
        assert!(config.validate_input);
        assert!(config.validate_output);
        assert_eq!(config.default_boundary_type, "network-on-prem");
        assert_eq!(config.catalog_path, None);
    }

    #[test]
    fn test_explicit_path_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("settings.toml");
        let config = AppConfig {
            validate_output: false,
            catalog_path: Some(PathBuf::from("threats.toml")),
            default_boundary_type: "network-cloud-provider".into(),
            ..Default::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_or_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "validate_input = \"maybe\"").unwrap();
        let err = load_config(Some(&bad)).unwrap_err();
        assert!(format!("{err:#}").contains("parse config"));
    }

    #[test]
    fn test_options_follow_config() {
        let config = AppConfig {
            validate_input: false,
            default_boundary_type: "network-virtual-lan".into(),
            ..Default::default()
        };
        let options = config.conversion_options();
        assert!(!options.validate_input);
        assert!(options.validate_output);
        assert_eq!(options.mapper.default_boundary_type, "network-virtual-lan");
    }
}
