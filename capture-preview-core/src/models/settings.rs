use serde::{Deserialize, Serialize};

use super::device::DeviceIdentity;
use super::format::FormatPreference;
use super::geometry::StatsCorner;
use super::tuning::TuningFlags;

/// The flat preference record the host persists between runs.
///
/// The core only reads the tuning flags and the preferred format when a
/// start request is built from it; loading and saving the file is the host's
/// concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewSettings {
    pub tuning: TuningFlags,

    /// Preferred capture mode, applied on the next start. Zero means Auto.
    pub preferred_format: FormatPreference,

    pub stats_overlay: bool,
    pub stats_position: StatsCorner,

    /// Process-level knobs honored by the host, not by the pipelines.
    pub high_priority: bool,
    pub one_ms_timer: bool,
    pub low_latency_gc: bool,

    pub remember_devices: bool,
    pub video_device: Option<DeviceIdentity>,
    pub audio_device: Option<DeviceIdentity>,
}

impl PreviewSettings {
    pub fn validate(&self) -> Result<(), String> {
        let pref = &self.preferred_format;
        if !pref.fps.is_finite() || pref.fps < 0.0 {
            return Err(format!("invalid preferred frame rate: {}", pref.fps));
        }
        if (pref.width > 0) != (pref.height > 0) {
            return Err(format!(
                "preferred format must set both width and height: {}x{}",
                pref.width, pref.height
            ));
        }
        if self.remember_devices
            && (self.video_device.as_ref().is_some_and(DeviceIdentity::is_empty)
                || self.audio_device.as_ref().is_some_and(DeviceIdentity::is_empty))
        {
            return Err("remembered device identity is blank".into());
        }
        Ok(())
    }

    /// Devices to open automatically, when both were remembered.
    pub fn remembered_devices(&self) -> Option<(&DeviceIdentity, &DeviceIdentity)> {
        if !self.remember_devices {
            return None;
        }
        Some((self.video_device.as_ref()?, self.audio_device.as_ref()?))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            tuning: TuningFlags::LOW_LATENCY,
            preferred_format: FormatPreference::AUTO,
            stats_overlay: false,
            stats_position: StatsCorner::TopLeft,
            high_priority: true,
            one_ms_timer: true,
            low_latency_gc: true,
            remember_devices: false,
            video_device: None,
            audio_device: None,
        }
    }
}
