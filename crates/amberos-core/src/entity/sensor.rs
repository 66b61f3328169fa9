use std::sync::Arc;

use amberos_api::Capability;

use super::description::{SensorDescription, SensorSource, SensorValue};
use super::{Attributes, CoordinatorBound, DeviceInfo, DeviceScope, Entity, base_attributes};
use crate::coordinator::PollCoordinator;
use crate::session::DeviceSession;

/// Numeric or text sensor backed by the central coordinator.
#[derive(Debug)]
pub struct Sensor {
    description: &'static SensorDescription,
    bound: CoordinatorBound,
    scope: Option<DeviceScope>,
}

impl Sensor {
    /// `unique_id`: `{serial}_{api_key}:{key}`, plus `_{device_id}` for
    /// disk and volume sensors.
    pub fn new(
        session: Arc<DeviceSession>,
        coordinator: PollCoordinator,
        description: &'static SensorDescription,
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

    pub fn bound(&self) -> &CoordinatorBound {
        &self.bound
    }

    /// Current value, scaled.
    pub fn native_value(&self) -> Option<SensorValue> {
        let handles = self.bound.handles();
        let device_id = self.scope.as_ref().map(|s| s.device_id.as_str());

        let raw = match self.description.source {
            SensorSource::Utilization(read) => read(handles.utilization.as_deref()?),
            SensorSource::Information(read) => read(handles.information.as_deref()?),
            SensorSource::Volume(read) => read(handles.storage.as_deref()?.get_volume(device_id?)?),
            SensorSource::Disk(read) => read(handles.storage.as_deref()?.get_disk(device_id?)?),
        }?;
        Some(self.description.scale.apply_value(raw))
    }

    /// Attribution, plus the full disk or volume record on status sensors.
    pub fn extra_state_attributes(&self) -> Attributes {
        let mut attrs = base_attributes();
        let handles = self.bound.handles();
        let (Some(storage), Some(scope)) = (handles.storage.as_deref(), self.scope.as_ref()) else {
            return attrs;
        };

        let details = match self.description.key {
            "disk_status" => storage
                .get_disk(&scope.device_id)
                .and_then(|d| serde_json::to_value(d).ok()),
            "volume_status" => storage
                .get_volume(&scope.device_id)
                .and_then(|v| serde_json::to_value(v).ok()),
            _ => None,
        };
        if let Some(serde_json::Value::Object(map)) = details {
            attrs.extend(map);
        }
        attrs
    }
}

impl Entity for Sensor {
    fn unique_id(&self) -> &str {
        self.bound.unique_id()
    }

    fn capability(&self) -> Capability {
        self.bound.capability()
    }

    fn available(&self) -> bool {
        self.bound.available()
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
