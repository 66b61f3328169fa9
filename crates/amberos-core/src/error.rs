// ── Core error types ──
//
// User-facing errors from amberos-core. Consumers never see vendor
// client errors directly; the `From<amberos_api::Error>` impl translates
// them into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot connect to device at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Device request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Entry is not loaded")]
    NotLoaded,

    // ── Capability errors ────────────────────────────────────────────
    #[error("Capability unavailable: {message}")]
    CapabilityUnavailable { message: String },

    // ── Poll errors ──────────────────────────────────────────────────
    #[error("Error communicating with API: {message}")]
    UpdateFailed { message: String },

    // ── Service dispatch errors ──────────────────────────────────────
    #[error("No entry with serial {serial}")]
    EntryNotFound { serial: String },

    #[error("More than one entry configured, must specify one of serials {serials:?}")]
    AmbiguousEntry { serials: Vec<String> },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api { message: String, code: Option<i64> },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the device session must be rebuilt.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns `true` for "feature not usable right now" failures.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable { .. })
    }
}

// ── Conversion from vendor client errors ─────────────────────────────

impl From<amberos_api::Error> for CoreError {
    fn from(err: amberos_api::Error) -> Self {
        match err {
            amberos_api::Error::LoginInvalid => Self::AuthenticationFailed {
                message: "Login invalid -- session expired or credentials rejected".into(),
            },
            amberos_api::Error::FileIndexNotEnabled => Self::CapabilityUnavailable {
                message: "file index is not enabled, please enable it".into(),
            },
            amberos_api::Error::FileIndexNotFound { path } => Self::CapabilityUnavailable {
                message: format!("'{path}' is not in the file index"),
            },
            amberos_api::Error::CapabilityUnavailable(capability) => {
                Self::CapabilityUnavailable {
                    message: format!("'{capability}' is not available on this device"),
                }
            }
            amberos_api::Error::Connection { host, reason } => {
                Self::ConnectionFailed { host, reason }
            }
            amberos_api::Error::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            amberos_api::Error::Api { message, code } => Self::Api { message, code },
            amberos_api::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking device call did not complete: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use amberos_api::Capability;

    use super::*;

    #[test]
    fn login_invalid_becomes_auth_failure() {
        let err = CoreError::from(amberos_api::Error::LoginInvalid);
        assert!(err.is_auth_failure());
        assert!(!err.is_capability_unavailable());
    }

    #[test]
    fn file_index_errors_are_capability_unavailable() {
        for api in [
            amberos_api::Error::FileIndexNotEnabled,
            amberos_api::Error::FileIndexNotFound { path: "/share/x.mp4".into() },
            amberos_api::Error::CapabilityUnavailable(Capability::Cast),
        ] {
            assert!(CoreError::from(api).is_capability_unavailable());
        }
    }

    #[test]
    fn timeouts_keep_their_duration() {
        let err = CoreError::from(amberos_api::Error::Timeout { timeout_secs: 7 });
        assert_eq!(err.to_string(), "Device request timed out after 7s");
    }
}
