//! Optional TOML configuration file supplying CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clipfetch_core::resolver::ResolverMode;
use clipfetch_core::session::ImpersonationProfile;
use serde::Deserialize;

const APP_DIR: &str = "clipfetch";

/// Defaults read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory assets are written to.
    pub output_dir: Option<PathBuf>,
    /// Auth cookie sent with share-page requests.
    pub cookie: Option<String>,
    /// Upstream HTTP proxy.
    pub proxy: Option<String>,
    /// Header impersonation profile.
    pub profile: Option<ImpersonationProfile>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Allow the third-party proxy fallback.
    pub proxy_fallback: Option<bool>,
    /// Resolution pipeline.
    pub pipeline: Option<ResolverMode>,
    /// Browser driver program.
    pub browser_command: Option<PathBuf>,
    /// Browser settle delay in milliseconds.
    pub settle_ms: Option<u64>,
    /// Accepted share-link host.
    pub share_host: Option<String>,
    /// Metadata API base URL.
    pub metadata_base: Option<String>,
    /// Proxy download base URL.
    pub proxy_base: Option<String>,
}

impl FileConfig {
    /// Validates values against the same ranges the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("timeout_secs", self.timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;

        if let Some(settle_ms) = self.settle_ms
            && settle_ms > 60_000
        {
            bail!("Invalid config value for `settle_ms`: {settle_ms}. Expected range: 0..=60000");
        }

        if let Some(host) = self.share_host.as_deref()
            && (host.trim().is_empty() || host.contains('/'))
        {
            bail!("Invalid config value for `share_host`: '{host}'. Expected a bare host name");
        }

        validate_base_url("metadata_base", self.metadata_base.as_deref())?;
        validate_base_url("proxy_base", self.proxy_base.as_deref())?;

        if let Some(cookie) = self.cookie.as_deref()
            && cookie.contains(['\r', '\n'])
        {
            bail!("Invalid config value for `cookie`: must be a single line");
        }

        Ok(())
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

fn validate_base_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was consulted, if one could be determined.
    pub path: Option<PathBuf>,
    /// Parsed config when the file existed.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    /// Parsed config, or all-`None` defaults.
    #[must_use]
    pub fn file_config(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/clipfetch/config.toml`
/// 2. `$HOME/.config/clipfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` (which must exist), or the default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref().filter(|p| p.exists()) else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
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
