use std::fmt;

use crate::models::stats::{FrameStatsSample, NativeVideoSize};

/// Live frame rate between two consecutive samples.
///
/// Zero when no time has passed or the drawn counter went backwards (the
/// renderer was rebuilt and its counters reset).
pub fn derive_fps(previous: &FrameStatsSample, current: &FrameStatsSample) -> f64 {
    let Some(elapsed) = current.sampled_at.checked_duration_since(previous.sampled_at) else {
        return 0.0;
    };
    let dt = elapsed.as_secs_f64();
    let drawn = i64::from(current.drawn_cumulative) - i64::from(previous.drawn_cumulative);
    if dt > 0.0 && drawn >= 0 {
        drawn as f64 / dt
    } else {
        0.0
    }
}

/// One line of live statistics, as shown in the stats overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReadout {
    pub resolution: NativeVideoSize,
    /// Live frame rate, or the nominal one when no live rate is available.
    /// Zero means unknown.
    pub fps: f64,
    pub dropped: i32,
}

impl fmt::Display for StatsReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Res: {}  FPS: ", self.resolution)?;
        if self.fps > 0.0 {
            write!(f, "{:.1}", self.fps)?;
        } else {
            f.write_str("n/a")?;
        }
        write!(f, "  Dropped: {}", self.dropped)
    }
}
