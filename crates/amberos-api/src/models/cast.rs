use serde::{Deserialize, Serialize};

/// Media playback (cast) state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cast {
    pub is_on: bool,
    pub playing: bool,
    pub source: Option<String>,
    pub source_list: Vec<String>,
    /// `0.0..=1.0`.
    pub volume_level: Option<f64>,
    pub muted: bool,
    pub media_title: Option<String>,
    pub channel_name: Option<String>,
    /// Seconds.
    pub duration: Option<u64>,
}
