// ── Entity descriptions ──
//
// Each description names one value and carries a typed accessor for it.
// Accessors are plain fn pointers fixed when the table is built.

use amberos_api::Capability;
use amberos_api::models::{Backup, Disk, Information, Security, Upgrade, Utilization, Volume};

/// A sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl SensorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<u32> for SensorValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u64> for SensorValue {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn from(v: u64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f64> for SensorValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for SensorValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Conversion from the device's raw unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Raw,
    /// Bytes to MiB, one decimal.
    Mebibytes,
    /// Bytes/s to KiB/s, one decimal.
    KibibytesPerSecond,
    /// Hundredths to load average, two decimals.
    Load,
    /// Bytes to TiB, two decimals.
    Tebibytes,
    /// Bytes to GiB, two decimals.
    Gibibytes,
}

impl Scale {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Self::Raw => raw,
            Self::Mebibytes => round(raw / 1024f64.powi(2), 1),
            Self::KibibytesPerSecond => round(raw / 1024.0, 1),
            Self::Load => round(raw / 100.0, 2),
            Self::Tebibytes => round(raw / 1024f64.powi(4), 2),
            Self::Gibibytes => round(raw / 1024f64.powi(3), 2),
        }
    }

    pub fn apply_value(self, value: SensorValue) -> SensorValue {
        match value {
            SensorValue::Number(n) => SensorValue::Number(self.apply(n)),
            text @ SensorValue::Text(_) => text,
        }
    }
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ── Sensor descriptions ──────────────────────────────────────────

/// Where a sensor reads its value from.
#[derive(Debug, Clone, Copy)]
pub enum SensorSource {
    Utilization(fn(&Utilization) -> Option<SensorValue>),
    Information(fn(&Information) -> Option<SensorValue>),
    Volume(fn(&Volume) -> Option<SensorValue>),
    Disk(fn(&Disk) -> Option<SensorValue>),
}

#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub key: &'static str,
    pub scale: Scale,
    pub source: SensorSource,
}

impl SensorDescription {
    pub fn capability(&self) -> Capability {
        match self.source {
            SensorSource::Utilization(_) => Capability::Utilization,
            SensorSource::Information(_) => Capability::Information,
            SensorSource::Volume(_) | SensorSource::Disk(_) => Capability::Storage,
        }
    }
}

pub const UTILIZATION_SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "cpu_user_load",
        scale: Scale::Raw,
        source: SensorSource::Utilization(|u| u.cpu_user_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "cpu_system_load",
        scale: Scale::Raw,
        source: SensorSource::Utilization(|u| u.cpu_system_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "cpu_total_load",
        scale: Scale::Raw,
        source: SensorSource::Utilization(|u| u.cpu_total_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "cpu_1min_load",
        scale: Scale::Load,
        source: SensorSource::Utilization(|u| u.cpu_1min_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "cpu_5min_load",
        scale: Scale::Load,
        source: SensorSource::Utilization(|u| u.cpu_5min_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "cpu_15min_load",
        scale: Scale::Load,
        source: SensorSource::Utilization(|u| u.cpu_15min_load.map(SensorValue::from)),
    },
    SensorDescription {
        key: "memory_real_usage",
        scale: Scale::Raw,
        source: SensorSource::Utilization(|u| u.memory_real_usage.map(SensorValue::from)),
    },
    SensorDescription {
        key: "memory_size",
        scale: Scale::Mebibytes,
        source: SensorSource::Utilization(|u| u.memory_size.map(SensorValue::from)),
    },
    SensorDescription {
        key: "memory_available_real",
        scale: Scale::Mebibytes,
        source: SensorSource::Utilization(|u| u.memory_available_real.map(SensorValue::from)),
    },
    SensorDescription {
        key: "memory_total_real",
        scale: Scale::Mebibytes,
        source: SensorSource::Utilization(|u| u.memory_total_real.map(SensorValue::from)),
    },
    SensorDescription {
        key: "network_up",
        scale: Scale::KibibytesPerSecond,
        source: SensorSource::Utilization(|u| u.network_up.map(SensorValue::from)),
    },
    SensorDescription {
        key: "network_down",
        scale: Scale::KibibytesPerSecond,
        source: SensorSource::Utilization(|u| u.network_down.map(SensorValue::from)),
    },
];

pub const STORAGE_VOL_SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "volume_status",
        scale: Scale::Raw,
        source: SensorSource::Volume(|v| Some(SensorValue::from(v.status.as_str()))),
    },
    SensorDescription {
        key: "volume_size_total",
        scale: Scale::Tebibytes,
        source: SensorSource::Volume(|v| v.size_total.map(SensorValue::from)),
    },
    SensorDescription {
        key: "volume_size_used",
        scale: Scale::Tebibytes,
        source: SensorSource::Volume(|v| v.size_used.map(SensorValue::from)),
    },
    SensorDescription {
        key: "volume_percentage_used",
        scale: Scale::Raw,
        source: SensorSource::Volume(|v| v.percentage_used().map(SensorValue::from)),
    },
];

pub const STORAGE_DISK_SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "disk_smart_status",
        scale: Scale::Raw,
        source: SensorSource::Disk(|d| Some(SensorValue::from(d.smart_status.as_str()))),
    },
    SensorDescription {
        key: "disk_status",
        scale: Scale::Raw,
        source: SensorSource::Disk(|d| Some(SensorValue::from(d.status.as_str()))),
    },
    SensorDescription {
        key: "disk_temp",
        scale: Scale::Raw,
        source: SensorSource::Disk(|d| d.temp.map(SensorValue::from)),
    },
];

pub const INFORMATION_SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "temperature",
        scale: Scale::Raw,
        source: SensorSource::Information(|i| i.temperature.map(SensorValue::from)),
    },
    SensorDescription {
        key: "uptime",
        scale: Scale::Raw,
        source: SensorSource::Information(|i| i.uptime.map(SensorValue::from)),
    },
];

// ── Binary sensor descriptions ───────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum BinarySource {
    Security(fn(&Security) -> bool),
    Backup(fn(&Backup) -> bool),
    Upgrade(fn(&Upgrade) -> bool),
    Disk(fn(&Disk) -> bool),
}

#[derive(Debug, Clone, Copy)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub source: BinarySource,
}

impl BinarySensorDescription {
    pub fn capability(&self) -> Capability {
        match self.source {
            BinarySource::Security(_) => Capability::Security,
            BinarySource::Backup(_) => Capability::Backup,
            BinarySource::Upgrade(_) => Capability::Upgrade,
            BinarySource::Disk(_) => Capability::Storage,
        }
    }
}

/// On means "needs attention".
pub const SECURITY_BINARY_SENSORS: &[BinarySensorDescription] = &[BinarySensorDescription {
    key: "status",
    source: BinarySource::Security(|s| !s.is_safe()),
}];

pub const BACKUP_BINARY_SENSORS: &[BinarySensorDescription] = &[BinarySensorDescription {
    key: "status",
    source: BinarySource::Backup(Backup::is_running),
}];

pub const UPGRADE_BINARY_SENSORS: &[BinarySensorDescription] = &[BinarySensorDescription {
    key: "update_available",
    source: BinarySource::Upgrade(|u| u.update_available),
}];

pub const STORAGE_DISK_BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: "disk_exceed_bad_sector_thr",
        source: BinarySource::Disk(|d| d.exceed_bad_sector_thr),
    },
    BinarySensorDescription {
        key: "disk_below_remain_life_thr",
        source: BinarySource::Disk(|d| d.below_remain_life_thr),
    },
];
