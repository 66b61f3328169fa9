use serde::{Deserialize, Serialize};

use super::StatusByCheck;

/// Security advisor state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    /// Overall status; `"safe"` when every check passes.
    pub status: String,
    pub status_by_check: StatusByCheck,
}

impl Security {
    pub fn is_safe(&self) -> bool {
        self.status == "safe"
    }
}

/// Backup job state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backup {
    /// Overall status; `"running"` while a job is in progress.
    pub status: String,
    pub status_by_check: StatusByCheck,
}

impl Backup {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// System-level facts. Reboot and shutdown are commands on the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct System {
    pub cpu_model: Option<String>,
    /// Installed memory in bytes.
    pub ram_size: Option<u64>,
    pub time_zone: Option<String>,
}

/// Firmware upgrade availability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Upgrade {
    pub update_available: bool,
    /// Empty when no newer firmware is published.
    pub available_version: String,
    pub release_notes: Option<String>,
}
