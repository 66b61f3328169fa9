// ── Capability registry ──
//
// Static enumeration of the device's capability groups. Each group is
// fetched (or not) as a unit by the orchestration layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One logical category of device functionality.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Information,
    Network,
    Security,
    Storage,
    Backup,
    System,
    Upgrade,
    Utilization,
    Cast,
}

impl Capability {
    /// Every capability group, in fetch order.
    pub const ALL: [Self; 9] = [
        Self::Information,
        Self::Network,
        Self::Security,
        Self::Storage,
        Self::Backup,
        Self::System,
        Self::Upgrade,
        Self::Utilization,
        Self::Cast,
    ];

    /// Stable key identifying the group, used in entity unique ids.
    pub fn api_key(self) -> &'static str {
        self.into()
    }

    /// Information and network carry the device identity (serial,
    /// hostname, MACs) and are fetched regardless of subscriptions.
    pub fn is_always_on(self) -> bool {
        matches!(self, Self::Information | Self::Network)
    }

    /// Position in [`Capability::ALL`], used for compact set storage.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Information => 0,
            Self::Network => 1,
            Self::Security => 2,
            Self::Storage => 3,
            Self::Backup => 4,
            Self::System => 5,
            Self::Upgrade => 6,
            Self::Utilization => 7,
            Self::Cast => 8,
        }
    }

    /// Single-bit mask for this capability.
    pub fn bit(self) -> u16 {
        1 << self.index()
    }
}
