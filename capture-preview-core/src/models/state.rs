use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::device::DeviceIdentity;
use super::format::VideoFormat;

/// Session lifecycle.
///
/// ```text
/// idle → starting → running → stopping → idle
///           ↓                     ↑
///           └──── (failed) ───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Description of the pipelines currently running.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub video_device: DeviceIdentity,
    pub audio_device: DeviceIdentity,
    /// Format committed on the video source, `None` when the device default is used.
    pub committed_format: Option<VideoFormat>,
}
