use thiserror::Error;

use crate::capability::Capability;

/// Top-level error type for the `amberos-api` crate.
///
/// Covers every failure a vendor client can surface. `amberos-core` maps
/// these into user-facing diagnostics and decides which ones trigger a
/// reconnect.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The session is no longer valid (expired, revoked, or the
    /// credentials were rejected at login).
    #[error("Login invalid -- session expired or credentials rejected")]
    LoginInvalid,

    // ── Capability availability ─────────────────────────────────────
    /// Cast playback by path needs the device's file index.
    #[error("File index is not enabled on the device")]
    FileIndexNotEnabled,

    /// The file index has no entry for the requested path.
    #[error("File not found in the device index: {path}")]
    FileIndexNotFound { path: String },

    /// The capability group is disabled or absent on this device.
    #[error("Capability '{0}' is not available on this device")]
    CapabilityUnavailable(Capability),

    // ── Transport ───────────────────────────────────────────────────
    /// Could not reach the device.
    #[error("Cannot connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    /// A single call exceeded the client's timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Device responses ────────────────────────────────────────────
    /// The device answered with an error envelope.
    #[error("Device API error: {message}")]
    Api { message: String, code: Option<i64> },

    /// Response body did not match the expected model.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the session must be rebuilt to make progress.
    pub fn is_login_invalid(&self) -> bool {
        matches!(self, Self::LoginInvalid)
    }

    /// Returns `true` if the failure means "this feature is not usable
    /// right now" rather than a broken session or transport.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(
            self,
            Self::FileIndexNotEnabled
                | Self::FileIndexNotFound { .. }
                | Self::CapabilityUnavailable(_)
        )
    }

    /// Returns `true` if retrying later might succeed without any change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}
