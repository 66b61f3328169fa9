use serde::{Deserialize, Serialize};

/// Storage pool state: volumes and physical disks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub volumes: Vec<Volume>,
    pub disks: Vec<Disk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volume {
    pub id: String,
    pub uuid: String,
    /// e.g. `raid_1`, `raid_5`.
    pub raidtype: String,
    pub status: String,
    /// Bytes.
    pub size_total: Option<u64>,
    /// Bytes.
    pub size_used: Option<u64>,
}

impl Volume {
    /// Used space as a percentage of the total, one decimal.
    pub fn percentage_used(&self) -> Option<f64> {
        let total = self.size_total.filter(|t| *t > 0)?;
        let used = self.size_used?;
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let pct = used as f64 / total as f64 * 100.0;
        Some((pct * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disk {
    pub id: String,
    pub name: String,
    /// May be empty; the first word of `model` stands in for it then.
    pub vendor: String,
    pub model: String,
    /// Firmware revision.
    pub fw: String,
    /// e.g. `SATA`, `SSD`.
    #[serde(rename = "type")]
    pub disk_type: String,
    pub status: String,
    pub smart_status: String,
    /// °C.
    pub temp: Option<f64>,
    pub exceed_bad_sector_thr: bool,
    pub below_remain_life_thr: bool,
}

impl Storage {
    pub fn volumes_ids(&self) -> Vec<&str> {
        self.volumes.iter().map(|v| v.id.as_str()).collect()
    }

    pub fn disks_ids(&self) -> Vec<&str> {
        self.disks.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn get_volume(&self, id: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.id == id)
    }

    pub fn get_disk(&self, id: &str) -> Option<&Disk> {
        self.disks.iter().find(|d| d.id == id)
    }
}
