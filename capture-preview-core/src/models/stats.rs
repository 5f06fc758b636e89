use std::fmt;
use std::time::Instant;

/// Cumulative renderer frame counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameCounters {
    pub dropped: i32,
    pub drawn: i32,
}

/// Renderer counters read at a known instant.
///
/// The caller keeps the previous sample to derive a frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatsSample {
    pub dropped_cumulative: i32,
    pub drawn_cumulative: i32,
    pub sampled_at: Instant,
}

impl FrameStatsSample {
    pub fn new(counters: FrameCounters, sampled_at: Instant) -> Self {
        Self {
            dropped_cumulative: counters.dropped,
            drawn_cumulative: counters.drawn,
            sampled_at,
        }
    }

    /// A zero sample, used as the baseline before the first real reading.
    pub fn zero(sampled_at: Instant) -> Self {
        Self::new(FrameCounters::default(), sampled_at)
    }

    pub fn counters(&self) -> FrameCounters {
        FrameCounters {
            dropped: self.dropped_cumulative,
            drawn: self.drawn_cumulative,
        }
    }
}

/// Size of the video the renderer is receiving, zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeVideoSize {
    pub width: i32,
    pub height: i32,
}

impl NativeVideoSize {
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for NativeVideoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}x{}", self.width, self.height)
        } else {
            f.write_str("n/a")
        }
    }
}
