use std::sync::Arc;

use amberos_api::Capability;

use super::description::{BinarySensorDescription, BinarySource};
use super::{Attributes, CoordinatorBound, DeviceInfo, DeviceScope, Entity, base_attributes};
use crate::coordinator::PollCoordinator;
use crate::session::DeviceSession;

/// On/off sensor backed by the central coordinator.
#[derive(Debug)]
pub struct BinarySensor {
    description: &'static BinarySensorDescription,
    bound: CoordinatorBound,
    scope: Option<DeviceScope>,
}

impl BinarySensor {
    pub fn new(
        session: Arc<DeviceSession>,
        coordinator: PollCoordinator,
        description: &'static BinarySensorDescription,
        serial: &str,
        scope: Option<DeviceScope>,
    ) -> Self {
        let capability = description.capability();
        let base = format!("{serial}_{}:{}", capability.api_key(), description.key);
        let unique_id = scope.as_ref().map_or_else(|| base.clone(), |s| s.unique_id(&base));
        Self {
            description,
            bound: CoordinatorBound::new(session, coordinator, capability, unique_id),
            scope,
        }
    }

    pub fn key(&self) -> &'static str {
        self.description.key
    }

    pub fn scope(&self) -> Option<&DeviceScope> {
        self.scope.as_ref()
    }

    pub fn is_on(&self) -> Option<bool> {
        let handles = self.bound.handles();
        match self.description.source {
            BinarySource::Security(read) => handles.security.as_deref().map(read),
            BinarySource::Backup(read) => handles.backup.as_deref().map(read),
            BinarySource::Upgrade(read) => handles.upgrade.as_deref().map(read),
            BinarySource::Disk(read) => {
                let device_id = &self.scope.as_ref()?.device_id;
                handles.storage.as_deref()?.get_disk(device_id).map(read)
            }
        }
    }

    /// Per-check status for security and backup; version details for
    /// upgrade.
    pub fn extra_state_attributes(&self) -> Attributes {
        let mut attrs = base_attributes();
        let handles = self.bound.handles();

        match self.description.source {
            BinarySource::Security(_) => {
                if let Some(security) = handles.security.as_deref() {
                    attrs.extend(
                        security
                            .status_by_check
                            .iter()
                            .map(|(k, v)| (k.clone(), v.as_str().into())),
                    );
                }
            }
            BinarySource::Backup(_) => {
                if let Some(backup) = handles.backup.as_deref() {
                    attrs.extend(
                        backup
                            .status_by_check
                            .iter()
                            .map(|(k, v)| (k.clone(), v.as_str().into())),
                    );
                }
            }
            BinarySource::Upgrade(_) => {
                if let Some(upgrade) = handles.upgrade.as_deref() {
                    if !upgrade.available_version.is_empty() {
                        attrs.insert(
                            "newest_version".into(),
                            upgrade.available_version.as_str().into(),
                        );
                        attrs.insert(
                            "release_notes".into(),
                            upgrade.release_notes.clone().into(),
                        );
                    }
                }
                if let Some(info) = handles.information.as_deref() {
                    attrs.insert("installed_version".into(), info.version_string.as_str().into());
                }
            }
            BinarySource::Disk(_) => {}
        }
        attrs
    }
}

impl Entity for BinarySensor {
    fn unique_id(&self) -> &str {
        self.bound.unique_id()
    }

    fn capability(&self) -> Capability {
        self.bound.capability()
    }

    /// Upgrade also needs information for the installed version.
    fn available(&self) -> bool {
        match self.description.source {
            BinarySource::Upgrade(_) => {
                self.bound.available() && self.bound.handles().information.is_some()
            }
            _ => self.bound.available(),
        }
    }

    fn device_info(&self) -> DeviceInfo {
        self.bound.device_info(self.scope.as_ref())
    }

    fn added_to_hub(&mut self) {
        self.bound.subscribe();
    }

    fn will_remove_from_hub(&mut self) {
        self.bound.unsubscribe();
    }
}
