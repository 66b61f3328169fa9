// ── Runtime entry configuration ──
//
// Describes *how* to reach one AmberOS device and how often to poll it.
// Carries credential data but never touches disk; `amberos-config`
// builds an `EntryConfig` and hands it in.

use std::time::Duration;

use amberos_api::ConnectionParams;
use secrecy::SecretString;

/// Default central poll interval, in minutes.
pub const DEFAULT_SCAN_INTERVAL_MINUTES: u64 = 15;
/// Default cast poll interval.
pub const DEFAULT_CAST_SCAN_INTERVAL: Duration = Duration::from_secs(5);
/// Default per-call timeout applied by the device client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Cooldown window used to coalesce manual refresh requests.
pub const REFRESH_COOLDOWN: Duration = Duration::from_secs(1);

/// Configuration for one integration entry (one device).
#[derive(Debug, Clone)]
pub struct EntryConfig {
    pub host: String,
    /// `None` picks the scheme default.
    pub port: Option<u16>,
    pub use_ssl: bool,
    pub username: String,
    pub password: SecretString,
    pub device_token: Option<String>,
    pub timeout: Duration,
    /// Central (slow) poll interval.
    pub scan_interval: Duration,
    /// Cast (fast) poll interval.
    pub cast_scan_interval: Duration,
    /// Volume ids to expose; `None` exposes every volume found at setup.
    pub volumes: Option<Vec<String>>,
    /// Disk ids to expose; `None` exposes every disk found at setup.
    pub disks: Option<Vec<String>>,
    /// Identifier of the hub instance, passed to the device with cast
    /// playback requests.
    pub instance_id: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            use_ssl: false,
            username: String::new(),
            password: SecretString::from(String::new()),
            device_token: None,
            timeout: DEFAULT_TIMEOUT,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_MINUTES * 60),
            cast_scan_interval: DEFAULT_CAST_SCAN_INTERVAL,
            volumes: None,
            disks: None,
            instance_id: "0".into(),
        }
    }
}

impl EntryConfig {
    /// Parameters handed to the client factory on every setup.
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self
                .port
                .unwrap_or_else(|| ConnectionParams::default_port(self.use_ssl)),
            use_ssl: self.use_ssl,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
            device_token: self.device_token.clone(),
        }
    }

    /// URL of the device's own web UI.
    pub fn config_url(&self) -> String {
        if self.use_ssl {
            format!("https://{}", self.host)
        } else {
            format!("http://{}", self.host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_to_scheme_default() {
        let cfg = EntryConfig {
            host: "nas".into(),
            use_ssl: true,
            ..EntryConfig::default()
        };
        assert_eq!(cfg.connection_params().port, 443);

        let cfg = EntryConfig {
            host: "nas".into(),
            port: Some(5000),
            ..EntryConfig::default()
        };
        assert_eq!(cfg.connection_params().port, 5000);
    }

    #[test]
    fn config_url_follows_ssl_flag() {
        let mut cfg = EntryConfig {
            host: "10.1.1.5".into(),
            ..EntryConfig::default()
        };
        assert_eq!(cfg.config_url(), "http://10.1.1.5");
        cfg.use_ssl = true;
        assert_eq!(cfg.config_url(), "https://10.1.1.5");
    }

    #[test]
    fn default_intervals() {
        let cfg = EntryConfig::default();
        assert_eq!(cfg.scan_interval, Duration::from_secs(900));
        assert_eq!(cfg.cast_scan_interval, Duration::from_secs(5));
    }
}
