use serde::{Deserialize, Serialize};

/// Live resource utilization.
///
/// Raw device units: percentages for CPU and memory usage, hundredths
/// for load averages, bytes for memory sizes, bytes per second for
/// network throughput.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Utilization {
    pub cpu_user_load: Option<u32>,
    pub cpu_system_load: Option<u32>,
    pub cpu_total_load: Option<u32>,
    pub cpu_1min_load: Option<u32>,
    pub cpu_5min_load: Option<u32>,
    pub cpu_15min_load: Option<u32>,
    pub memory_real_usage: Option<u32>,
    pub memory_size: Option<u64>,
    pub memory_available_real: Option<u64>,
    pub memory_total_real: Option<u64>,
    pub network_up: Option<u64>,
    pub network_down: Option<u64>,
}
