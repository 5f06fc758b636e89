use crate::models::device::DeviceIdentity;
use crate::models::format::FormatPreference;
use crate::models::geometry::{DestinationRect, SurfaceHandle};
use crate::models::settings::PreviewSettings;
use crate::models::tuning::TuningFlags;
use crate::pipeline::VideoPipelineRequest;

/// Immutable description of one session start.
///
/// Changing any of these values on a live session means stopping and
/// starting again (see [`SessionManager::restart`](super::SessionManager::restart)).
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub video_device: DeviceIdentity,
    pub audio_device: DeviceIdentity,
    pub surface: SurfaceHandle,
    pub initial_rect: DestinationRect,
    pub tuning: TuningFlags,
    pub preferred_format: FormatPreference,
}

impl StartRequest {
    pub fn new(
        video_device: impl Into<DeviceIdentity>,
        audio_device: impl Into<DeviceIdentity>,
        surface: SurfaceHandle,
        initial_rect: DestinationRect,
    ) -> Self {
        Self {
            video_device: video_device.into(),
            audio_device: audio_device.into(),
            surface,
            initial_rect,
            tuning: TuningFlags::default(),
            preferred_format: FormatPreference::AUTO,
        }
    }

    /// Take tuning flags and the preferred format from a settings snapshot.
    pub fn from_settings(
        settings: &PreviewSettings,
        video_device: impl Into<DeviceIdentity>,
        audio_device: impl Into<DeviceIdentity>,
        surface: SurfaceHandle,
        initial_rect: DestinationRect,
    ) -> Self {
        Self::new(video_device, audio_device, surface, initial_rect)
            .with_tuning(settings.tuning)
            .with_preferred_format(settings.preferred_format)
    }

    pub fn with_tuning(mut self, tuning: TuningFlags) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_preferred_format(mut self, preferred_format: FormatPreference) -> Self {
        self.preferred_format = preferred_format;
        self
    }

    pub(crate) fn video(&self) -> VideoPipelineRequest {
        VideoPipelineRequest {
            device: self.video_device.clone(),
            surface: self.surface,
            initial_rect: self.initial_rect,
            tuning: self.tuning,
            preferred_format: self.preferred_format,
        }
    }
}
