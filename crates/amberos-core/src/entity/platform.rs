// ── Platform setup ──
//
// Builds every entity of a loaded entry from the handles seeded by
// setup, honouring the configured volume and disk allow-lists.

use std::sync::Arc;

use tracing::{debug, warn};

use super::description::{
    BACKUP_BINARY_SENSORS, BinarySensorDescription, INFORMATION_SENSORS, SECURITY_BINARY_SENSORS,
    STORAGE_DISK_BINARY_SENSORS, STORAGE_DISK_SENSORS, STORAGE_VOL_SENSORS, SensorDescription,
    UPGRADE_BINARY_SENSORS, UTILIZATION_SENSORS,
};
use super::{BinarySensor, CastPlayer, CastSourceSelect, DeviceKind, DeviceScope, Entity, Sensor};
use crate::entry::EntryRuntime;
use crate::error::CoreError;
use crate::session::Handles;

/// All entities of one entry.
#[derive(Debug)]
pub struct EntitySet {
    pub sensors: Vec<Sensor>,
    pub binary_sensors: Vec<BinarySensor>,
    pub media_player: CastPlayer,
    pub cast_select: CastSourceSelect,
}

impl EntitySet {
    pub fn iter(&self) -> impl Iterator<Item = &dyn Entity> {
        self.sensors
            .iter()
            .map(|e| e as &dyn Entity)
            .chain(self.binary_sensors.iter().map(|e| e as &dyn Entity))
            .chain(std::iter::once(&self.media_player as &dyn Entity))
            .chain(std::iter::once(&self.cast_select as &dyn Entity))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Entity> {
        self.sensors
            .iter_mut()
            .map(|e| e as &mut dyn Entity)
            .chain(self.binary_sensors.iter_mut().map(|e| e as &mut dyn Entity))
            .chain(std::iter::once(&mut self.media_player as &mut dyn Entity))
            .chain(std::iter::once(&mut self.cast_select as &mut dyn Entity))
    }

    /// Attach every entity (subscribes their groups).
    pub fn add_all(&mut self) {
        for entity in self.iter_mut() {
            entity.added_to_hub();
        }
    }

    /// Detach every entity (drops their subscriptions).
    pub fn remove_all(&mut self) {
        for entity in self.iter_mut() {
            entity.will_remove_from_hub();
        }
    }

    pub fn unique_ids(&self) -> Vec<&str> {
        self.iter().map(Entity::unique_id).collect()
    }
}

/// Build the entity set of a loaded entry. Entities are not attached;
/// call [`EntitySet::add_all`].
pub fn build_entities(runtime: &EntryRuntime) -> Result<EntitySet, CoreError> {
    let session = runtime.session();
    let handles = session.handles();
    let serial = handles.serial().ok_or(CoreError::NotLoaded)?.to_owned();
    let config = session.config();
    let central = runtime.central();

    let sensor = |description: &'static SensorDescription, scope: Option<DeviceScope>| {
        Sensor::new(Arc::clone(session), central.clone(), description, &serial, scope)
    };
    let binary = |description: &'static BinarySensorDescription, scope: Option<DeviceScope>| {
        BinarySensor::new(Arc::clone(session), central.clone(), description, &serial, scope)
    };

    let mut sensors: Vec<Sensor> = UTILIZATION_SENSORS.iter().map(|d| sensor(d, None)).collect();

    let volumes = allowed(&handles, config.volumes.as_deref(), DeviceKind::Volume);
    for scope in &volumes {
        sensors.extend(STORAGE_VOL_SENSORS.iter().map(|d| sensor(d, Some(scope.clone()))));
    }
    let disks = allowed(&handles, config.disks.as_deref(), DeviceKind::Disk);
    for scope in &disks {
        sensors.extend(STORAGE_DISK_SENSORS.iter().map(|d| sensor(d, Some(scope.clone()))));
    }
    sensors.extend(INFORMATION_SENSORS.iter().map(|d| sensor(d, None)));

    let mut binary_sensors: Vec<BinarySensor> = SECURITY_BINARY_SENSORS
        .iter()
        .chain(BACKUP_BINARY_SENSORS)
        .chain(UPGRADE_BINARY_SENSORS)
        .map(|d| binary(d, None))
        .collect();
    for scope in &disks {
        binary_sensors.extend(
            STORAGE_DISK_BINARY_SENSORS
                .iter()
                .map(|d| binary(d, Some(scope.clone()))),
        );
    }

    let media_player = CastPlayer::new(Arc::clone(session), runtime.cast().clone(), &serial);
    let cast_select = CastSourceSelect::new(Arc::clone(session), runtime.cast().clone(), &serial);

    debug!(
        entry = %serial,
        sensors = sensors.len(),
        binary_sensors = binary_sensors.len(),
        volumes = volumes.len(),
        disks = disks.len(),
        "entities built"
    );

    Ok(EntitySet {
        sensors,
        binary_sensors,
        media_player,
        cast_select,
    })
}

/// Scopes for the allow-listed ids, or for every id storage reports when
/// no allow-list is configured.
fn allowed(handles: &Handles, allow: Option<&[String]>, kind: DeviceKind) -> Vec<DeviceScope> {
    let Some(storage) = handles.storage.as_deref() else {
        return Vec::new();
    };
    let present = match kind {
        DeviceKind::Volume => storage.volumes_ids(),
        DeviceKind::Disk => storage.disks_ids(),
    };
    if present.is_empty() {
        return Vec::new();
    }

    let ids: Vec<&str> = match allow {
        Some(allow) => allow.iter().map(String::as_str).collect(),
        None => present,
    };
    ids.into_iter()
        .filter_map(|id| {
            let scope = match kind {
                DeviceKind::Volume => DeviceScope::volume(handles, id),
                DeviceKind::Disk => DeviceScope::disk(handles, id),
            };
            if scope.is_none() {
                warn!(device = %id, "configured storage device not found, skipping");
            }
            scope
        })
        .collect()
}
