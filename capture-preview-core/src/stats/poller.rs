use std::time::Duration;

use crate::models::stats::FrameStatsSample;
use crate::session::SessionManager;

use super::fps::{derive_fps, StatsReadout};

/// How often a host is expected to tick the poller while running.
pub const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Caller-side stats loop state: keeps the previous sample so each tick can
/// derive a live frame rate.
#[derive(Debug, Default)]
pub struct StatsPoller {
    previous: Option<FrameStatsSample>,
}

impl StatsPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous sample, e.g. after the session was restarted.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Record a sample and return the live frame rate since the last one.
    pub fn observe(&mut self, sample: FrameStatsSample) -> f64 {
        let fps = self
            .previous
            .as_ref()
            .map_or(0.0, |previous| derive_fps(previous, &sample));
        self.previous = Some(sample);
        fps
    }

    pub async fn tick(&mut self, manager: &SessionManager) -> StatsReadout {
        let sample = manager.frame_stats().await;
        let mut fps = self.observe(sample);
        if fps <= 0.0 {
            fps = manager.nominal_fps().await;
        }
        StatsReadout {
            resolution: manager.native_video_size().await,
            fps,
            dropped: sample.dropped_cumulative,
        }
    }

    /// [`tick`](Self::tick) for hosts without an async runtime.
    pub fn tick_blocking(&mut self, manager: &SessionManager) -> StatsReadout {
        let sample = manager.frame_stats().wait();
        let mut fps = self.observe(sample);
        if fps <= 0.0 {
            fps = manager.nominal_fps().wait();
        }
        StatsReadout {
            resolution: manager.native_video_size().wait(),
            fps,
            dropped: sample.dropped_cumulative,
        }
    }
}
