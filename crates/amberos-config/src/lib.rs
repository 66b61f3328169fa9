//! Shared configuration for AmberOS entries.
//!
//! TOML profiles (one per device), environment overrides, credential
//! resolution (env + keyring + plaintext), and translation to
//! `amberos_core::EntryConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use amberos_core::EntryConfig;
use amberos_core::config::{
    DEFAULT_CAST_SCAN_INTERVAL, DEFAULT_SCAN_INTERVAL_MINUTES, DEFAULT_TIMEOUT,
};

/// Keyring service name; entries are stored as `{profile}/password`.
const KEYRING_SERVICE: &str = "amberos";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// One profile per device.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

/// Values every profile inherits unless it overrides them.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Central poll interval in minutes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Cast poll interval in seconds.
    #[serde(default = "default_cast_scan_interval")]
    pub cast_scan_interval: u64,

    /// Sent with cast playback requests to identify this hub.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
            cast_scan_interval: default_cast_scan_interval(),
            instance_id: default_instance_id(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_MINUTES
}
fn default_cast_scan_interval() -> u64 {
    DEFAULT_CAST_SCAN_INTERVAL.as_secs()
}
fn default_instance_id() -> String {
    "0".into()
}

/// A named device profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Hostname or IP address of the NAS.
    pub host: String,

    /// Override the scheme's default port.
    pub port: Option<u16>,

    #[serde(default)]
    pub use_ssl: bool,

    pub username: String,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Token issued when the device was first paired.
    pub device_token: Option<String>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override central poll interval (minutes).
    pub scan_interval: Option<u64>,

    /// Override cast poll interval (seconds).
    pub cast_scan_interval: Option<u64>,

    /// Volume ids to expose; all when absent.
    pub volumes: Option<Vec<String>>,

    /// Disk ids to expose; all when absent.
    pub disks: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "latticework", "amberos").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("amberos");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are fine) layered over the defaults,
/// with `AMBEROS_` environment variables on top. Nested keys use `__`,
/// e.g. `AMBEROS_DEFAULTS__SCAN_INTERVAL=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AMBEROS_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password: the profile's env var, then the system
/// keyring, then plaintext in the config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `EntryConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_entry_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<EntryConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let scan_interval = positive(
        "scan_interval",
        profile.scan_interval.unwrap_or(defaults.scan_interval),
    )?;
    let cast_scan_interval = positive(
        "cast_scan_interval",
        profile.cast_scan_interval.unwrap_or(defaults.cast_scan_interval),
    )?;
    let timeout = positive("timeout", profile.timeout.unwrap_or(defaults.timeout))?;

    let password = resolve_password(profile, profile_name)?;

    Ok(EntryConfig {
        host: profile.host.trim().to_owned(),
        port: profile.port,
        use_ssl: profile.use_ssl,
        username: profile.username.clone(),
        password,
        device_token: profile.device_token.clone(),
        timeout: Duration::from_secs(timeout),
        scan_interval: Duration::from_secs(scan_interval * 60),
        cast_scan_interval: Duration::from_secs(cast_scan_interval),
        volumes: profile.volumes.clone(),
        disks: profile.disks.clone(),
        instance_id: defaults.instance_id.clone(),
    })
}

/// Entry configs for every profile, sorted by profile name.
pub fn entry_configs(cfg: &Config) -> Result<Vec<(String, EntryConfig)>, ConfigError> {
    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let entry = profile_to_entry_config(&cfg.profiles[name], name, &cfg.defaults)?;
            Ok((name.clone(), entry))
        })
        .collect()
}

fn positive(field: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}
