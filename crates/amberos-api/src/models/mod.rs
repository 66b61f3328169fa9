// ── Typed capability models ──
//
// One model per capability group. A successful `DeviceClient::update`
// returns the group's full state wrapped in `CapabilityData`.

mod cast;
mod status;
mod storage;
mod utilization;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;

pub use cast::Cast;
pub use status::{Backup, Security, System, Upgrade};
pub use storage::{Disk, Storage, Volume};
pub use utilization::Utilization;

/// Per-check status strings (check name -> status), as reported by the
/// security and backup groups.
pub type StatusByCheck = BTreeMap<String, String>;

/// Device identity and general information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Information {
    pub serial: String,
    pub model: String,
    pub version_string: String,
    /// System temperature in °C.
    pub temperature: Option<f64>,
    /// Seconds since boot.
    pub uptime: Option<u64>,
}

/// Network identity of the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub hostname: String,
    pub macs: Vec<String>,
}

/// Result of one capability fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityData {
    Information(Information),
    Network(Network),
    Security(Security),
    Storage(Storage),
    Backup(Backup),
    System(System),
    Upgrade(Upgrade),
    Utilization(Utilization),
    Cast(Cast),
}

impl CapabilityData {
    /// The group this data belongs to.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Information(_) => Capability::Information,
            Self::Network(_) => Capability::Network,
            Self::Security(_) => Capability::Security,
            Self::Storage(_) => Capability::Storage,
            Self::Backup(_) => Capability::Backup,
            Self::System(_) => Capability::System,
            Self::Upgrade(_) => Capability::Upgrade,
            Self::Utilization(_) => Capability::Utilization,
            Self::Cast(_) => Capability::Cast,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn information_tolerates_missing_fields() {
        let info: Information =
            serde_json::from_value(json!({ "serial": "AMB123", "model": "Amber" })).unwrap();
        assert_eq!(
            info,
            Information {
                serial: "AMB123".into(),
                model: "Amber".into(),
                ..Information::default()
            }
        );
    }

    #[test]
    fn data_reports_its_capability() {
        let data = CapabilityData::Network(Network::default());
        assert_eq!(data.capability(), Capability::Network);
        let data = CapabilityData::Cast(Cast::default());
        assert_eq!(data.capability(), Capability::Cast);
    }
}
