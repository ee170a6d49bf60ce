//! Application configuration: the persisted default host and transport limits.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use optical_core::DEFAULT_MAX_AGE;
use serde::{Deserialize, Serialize};
use url::Url;

/// TOML-backed file configuration for optical defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Optica host used when `--host` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_host: Option<String>,
    /// Response cache freshness window in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_age_secs: Option<u64>,
    /// Optional HTTP connect timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Optional overall HTTP request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(host) = self.default_host.as_deref() {
            parse_host(host).context("Invalid config value for `default_host`")?;
        }
        if let Some(max_age) = self.cache_max_age_secs
            && !(1..=86_400).contains(&max_age)
        {
            bail!(
                "Invalid config value for `cache_max_age_secs`: {max_age}. Expected range: 1..=86400"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }

    /// Cache freshness window, falling back to the 15-minute default.
    #[must_use]
    pub fn cache_max_age(&self) -> Duration {
        self.cache_max_age_secs
            .map_or(DEFAULT_MAX_AGE, Duration::from_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Parses and checks an Optica host URI.
pub fn parse_host(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid host URI '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "Invalid host URI '{raw}': scheme '{}' is not supported, use http:// or https://",
            url.scheme()
        );
    }
    if url.host_str().is_none_or(str::is_empty) {
        bail!("Invalid host URI '{raw}': no host");
    }
    Ok(url)
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config, or defaults when there is no file.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/optical/config.toml`
/// 2. `$HOME/.config/optical/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_xdg_dir("XDG_CONFIG_HOME", ".config").map(|dir| dir.join("config.toml"))
}

/// Resolves the response cache root.
///
/// Priority:
/// 1. `$XDG_CACHE_HOME/optical`
/// 2. `$HOME/.cache/optical`
#[must_use]
pub fn resolve_default_cache_root() -> Option<PathBuf> {
    resolve_xdg_dir("XDG_CACHE_HOME", ".cache")
}

fn resolve_xdg_dir(xdg_var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(base) = env_var_non_empty_os(xdg_var) {
        return Some(PathBuf::from(base).join("optical"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(PathBuf::from(home).join(home_fallback).join("optical"))
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config,
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Writes `config` to `path`, creating parent directories.
pub fn save_file_config(path: &Path, config: &FileConfig) -> Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory '{}'", parent.display())
        })?;
    }
    let raw = toml::to_string(config).context("Failed to encode config")?;
    fs::write(path, raw)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))
}
