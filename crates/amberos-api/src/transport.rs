// Connection parameters handed to a vendor client factory.
//
// Everything a client needs to open one authenticated session. The
// orchestration layer builds a fresh set for every setup, so a reload
// always starts from a clean client.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Default HTTP port when none is configured.
pub const DEFAULT_PORT: u16 = 80;
/// Default HTTPS port when none is configured.
pub const DEFAULT_PORT_SSL: u16 = 443;

/// Shared connection configuration for building a device client.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub username: String,
    pub password: SecretString,
    /// Per-call timeout applied by the client.
    pub timeout: Duration,
    /// Token issued at first pairing, if the device handed one out.
    pub device_token: Option<String>,
}

impl ConnectionParams {
    /// The device root URL including port, e.g. `https://nas.local:443/`.
    pub fn base_url(&self) -> Result<Url, Error> {
        let scheme = if self.use_ssl { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{}:{}", self.host, self.port)).map_err(|e| {
            Error::Connection {
                host: self.host.clone(),
                reason: format!("invalid host: {e}"),
            }
        })
    }

    /// Default port for the selected scheme.
    pub fn default_port(use_ssl: bool) -> u16 {
        if use_ssl { DEFAULT_PORT_SSL } else { DEFAULT_PORT }
    }
}
