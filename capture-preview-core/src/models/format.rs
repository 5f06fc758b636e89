use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// DirectShow-style reference time units per second (100 ns ticks).
pub const REFERENCE_TIME_PER_SECOND: f64 = 10_000_000.0;

/// A concrete video mode a capture source can produce.
///
/// `fps == 0.0` means the frame rate is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoFormat {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self { width, height, fps }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn same_resolution(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Display/selection order: larger area first, then higher frame rate.
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        b.area()
            .cmp(&a.area())
            .then_with(|| b.fps.partial_cmp(&a.fps).unwrap_or(Ordering::Equal))
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fps > 0.0 {
            write!(f, "{}x{} @ {} fps", self.width, self.height, format_fps(self.fps))
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

/// Formats a frame rate with at most one decimal ("59.9", "30").
fn format_fps(fps: f64) -> String {
    let rounded = (fps * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// A capability entry exactly as the device reports it.
///
/// `height` may be negative for bottom-up layouts; `avg_time_per_frame` is in
/// 100 ns units and zero when the device does not state a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCapability {
    pub width: i32,
    pub height: i32,
    pub avg_time_per_frame: i64,
}

impl RawCapability {
    /// Converts to a `VideoFormat`, or `None` when the entry has no usable size.
    pub fn to_format(&self) -> Option<VideoFormat> {
        let width = u32::try_from(self.width).ok().filter(|w| *w > 0)?;
        let height = self.height.unsigned_abs();
        if height == 0 {
            return None;
        }
        let fps = if self.avg_time_per_frame > 0 {
            REFERENCE_TIME_PER_SECOND / self.avg_time_per_frame as f64
        } else {
            0.0
        };
        Some(VideoFormat::new(width, height, fps))
    }
}

/// The operator's preferred capture mode. Zero width or height means "Auto".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FormatPreference {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

impl FormatPreference {
    pub const AUTO: Self = Self {
        width: 0,
        height: 0,
        fps: 0.0,
    };

    pub fn new(width: i32, height: i32, fps: f64) -> Self {
        Self { width, height, fps }
    }

    pub fn is_auto(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl From<VideoFormat> for FormatPreference {
    fn from(format: VideoFormat) -> Self {
        Self {
            width: i32::try_from(format.width).unwrap_or(i32::MAX),
            height: i32::try_from(format.height).unwrap_or(i32::MAX),
            fps: format.fps,
        }
    }
}

impl fmt::Display for FormatPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_auto() {
            return f.write_str("Auto");
        }
        if self.fps > 0.0 {
            write!(f, "{}x{} @ {} fps", self.width, self.height, format_fps(self.fps))
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}
