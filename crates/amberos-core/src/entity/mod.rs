// ── Entity layer ──
//
// Entities read capability handles from the session and subscribe to the
// group they display. Shared behavior is composed, not inherited:
// `CoordinatorBound` ties an entity to a coordinator and a subscription,
// `DeviceScope` describes the disk or volume a storage entity belongs to.

pub mod binary_sensor;
pub mod description;
pub mod media_player;
pub mod platform;
pub mod select;
pub mod sensor;

use std::collections::BTreeMap;
use std::sync::Arc;

use amberos_api::Capability;
use serde::Serialize;
use tokio::sync::watch;

use crate::coordinator::{PollCoordinator, PollStatus};
use crate::session::{DeviceSession, Handles};
use crate::subscription::Subscription;

pub use binary_sensor::BinarySensor;
pub use media_player::{CastPlayer, PlayerState};
pub use platform::{EntitySet, build_entities};
pub use select::CastSourceSelect;
pub use sensor::Sensor;

pub const ATTRIBUTION: &str = "Data provided by Latticework AmberOS";
pub const MANUFACTURER: &str = "Latticework Inc.";
pub const DEVICE_NAME: &str = "Latticework AmberOS";

/// Extra state attributes of an entity.
pub type Attributes = BTreeMap<String, serde_json::Value>;

fn base_attributes() -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("attribution".into(), ATTRIBUTION.into());
    attrs
}

/// Common surface of every entity.
pub trait Entity: Send + Sync {
    fn unique_id(&self) -> &str;

    /// Group the entity reads from and subscribes to.
    fn capability(&self) -> Capability;

    fn available(&self) -> bool;

    fn device_info(&self) -> DeviceInfo;

    /// Called when the entity is attached; subscribes its group.
    fn added_to_hub(&mut self);

    /// Called before the entity is detached; drops its subscription.
    fn will_remove_from_hub(&mut self);
}

// ── Device registry info ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub sw_version: Option<String>,
    /// Identifier of the parent device.
    pub via_device: Option<String>,
    pub configuration_url: Option<String>,
}

impl DeviceInfo {
    /// The NAS itself.
    pub fn hub(handles: &Handles, configuration_url: &str) -> Self {
        let info = handles.information.as_deref();
        Self {
            identifier: info.map(|i| i.serial.clone()).unwrap_or_default(),
            name: DEVICE_NAME.into(),
            manufacturer: Some(MANUFACTURER.into()),
            model: info.map(|i| i.model.clone()),
            sw_version: info.map(|i| i.version_string.clone()),
            via_device: None,
            configuration_url: Some(configuration_url.into()),
        }
    }
}

// ── CoordinatorBound ─────────────────────────────────────────────

/// Ties an entity to its coordinator and its capability subscription.
#[derive(Debug)]
pub struct CoordinatorBound {
    session: Arc<DeviceSession>,
    coordinator: PollCoordinator,
    capability: Capability,
    unique_id: String,
    subscription: Option<Subscription>,
}

impl CoordinatorBound {
    pub fn new(
        session: Arc<DeviceSession>,
        coordinator: PollCoordinator,
        capability: Capability,
        unique_id: String,
    ) -> Self {
        Self {
            session,
            coordinator,
            capability,
            unique_id,
            subscription: None,
        }
    }

    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    pub fn coordinator(&self) -> &PollCoordinator {
        &self.coordinator
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn handles(&self) -> Arc<Handles> {
        self.session.handles()
    }

    /// Available while the group has a handle.
    pub fn available(&self) -> bool {
        self.handles().is_active(self.capability)
    }

    /// Coordinator status; changes whenever a refresh completes.
    pub fn updates(&self) -> watch::Receiver<PollStatus> {
        self.coordinator.status()
    }

    pub fn subscribe(&mut self) {
        if self.subscription.is_none() {
            self.subscription = Some(self.session.subscribe(self.capability, &self.unique_id));
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Registry info of the NAS, or of `scope` when the entity belongs to
    /// one of its disks or volumes.
    pub fn device_info(&self, scope: Option<&DeviceScope>) -> DeviceInfo {
        let handles = self.handles();
        let url = self.session.config().config_url();
        match scope {
            Some(scope) => scope.device_info(handles.serial().unwrap_or_default(), &url),
            None => DeviceInfo::hub(&handles, &url),
        }
    }
}

// ── DeviceScope ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Volume,
    Disk,
}

/// A disk or volume a storage entity is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceScope {
    pub kind: DeviceKind,
    pub device_id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
    pub device_type: String,
}

impl DeviceScope {
    /// Volumes have no name of their own; the pool uuid is humanised
    /// instead, and the NAS itself is the manufacturer.
    pub fn volume(handles: &Handles, device_id: &str) -> Option<Self> {
        let volume = handles.storage.as_deref()?.get_volume(device_id)?;
        let info = handles.information.as_deref();
        Some(Self {
            kind: DeviceKind::Volume,
            device_id: device_id.to_owned(),
            name: capitalize(&volume.uuid.replace('_', " ")),
            manufacturer: MANUFACTURER.into(),
            model: info.map(|i| i.model.clone()).unwrap_or_default(),
            firmware: info.map(|i| i.version_string.clone()).unwrap_or_default(),
            device_type: volume.raidtype.replace('_', " ").replace("raid", "RAID"),
        })
    }

    pub fn disk(handles: &Handles, device_id: &str) -> Option<Self> {
        let disk = handles.storage.as_deref()?.get_disk(device_id)?;
        let manufacturer = if disk.vendor.is_empty() {
            disk.model.split(' ').next().unwrap_or_default().to_owned()
        } else {
            disk.vendor.clone()
        };
        Some(Self {
            kind: DeviceKind::Disk,
            device_id: device_id.to_owned(),
            name: disk.name.clone(),
            manufacturer,
            model: disk.model.clone(),
            firmware: disk.fw.clone(),
            device_type: disk.disk_type.clone(),
        })
    }

    /// Unique id of an entity scoped to this device.
    pub fn unique_id(&self, base: &str) -> String {
        format!("{base}_{}", self.device_id)
    }

    pub fn device_info(&self, serial: &str, configuration_url: &str) -> DeviceInfo {
        DeviceInfo {
            identifier: format!("{serial}_{}", self.device_id),
            name: format!("{DEVICE_NAME} ({} - {})", self.name, self.device_type),
            manufacturer: Some(self.manufacturer.clone()),
            model: Some(self.model.clone()),
            sw_version: Some(self.firmware.clone()),
            via_device: Some(serial.to_owned()),
            configuration_url: Some(configuration_url.to_owned()),
        }
    }
}

/// First character upper case, the rest lower case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
