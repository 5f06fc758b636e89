//! Read-only queries against the running preview pipeline.
//!
//! Every function here degrades to a zero/unknown value instead of failing:
//! missing reporting interfaces and queries made while nothing is running are
//! `StatsUnavailable`, reported through `failures` and otherwise ignored.

use crate::models::error::SoftFailure;
use crate::models::format::REFERENCE_TIME_PER_SECOND;
use crate::models::stats::{FrameCounters, NativeVideoSize};
use crate::pipeline::VideoPipeline;
use crate::traits::media_backend::MediaBackend;

/// Cumulative dropped/drawn counters of the renderer.
///
/// Prefers the renderer's quality-reporting interface, then a frame-drop
/// interface on the renderer or its input; zeros when neither exists.
pub fn sample_frame_counters<B: MediaBackend>(
    backend: &mut B,
    video: Option<&VideoPipeline<B>>,
    failures: &mut Vec<SoftFailure>,
) -> FrameCounters {
    let Some(renderer) = video.and_then(VideoPipeline::renderer) else {
        return FrameCounters::default();
    };

    match backend.quality_counters(renderer) {
        Ok(Some(counters)) => return counters,
        Ok(None) => {}
        Err(e) => unavailable(failures, format!("quality counters: {}", e)),
    }
    match backend.dropped_frame_counters(renderer) {
        Ok(Some(counters)) => counters,
        Ok(None) => {
            unavailable(failures, "renderer exposes no frame counters".into());
            FrameCounters::default()
        }
        Err(e) => {
            unavailable(failures, format!("dropped frame counters: {}", e));
            FrameCounters::default()
        }
    }
}

/// Size of the video the renderer receives; zero when unknown.
pub fn native_video_size<B: MediaBackend>(
    backend: &mut B,
    video: Option<&VideoPipeline<B>>,
    failures: &mut Vec<SoftFailure>,
) -> NativeVideoSize {
    let Some(control) = video.and_then(VideoPipeline::renderer_control) else {
        return NativeVideoSize::default();
    };
    match backend.native_video_size(control) {
        Ok(size) => size,
        Err(e) => {
            unavailable(failures, format!("native video size: {}", e));
            NativeVideoSize::default()
        }
    }
}

/// Frame rate of the format the source committed to; zero when unknown.
pub fn nominal_fps<B: MediaBackend>(
    backend: &mut B,
    video: Option<&VideoPipeline<B>>,
    failures: &mut Vec<SoftFailure>,
) -> f64 {
    let Some(pipeline) = video else {
        return 0.0;
    };
    let (Some(builder), Some(source)) = (pipeline.graph_builder(), pipeline.source()) else {
        return 0.0;
    };
    match backend.current_frame_interval(builder, source) {
        Ok(Some(interval)) => fps_from_frame_interval(interval),
        Ok(None) => 0.0,
        Err(e) => {
            unavailable(failures, format!("nominal frame interval: {}", e));
            0.0
        }
    }
}

/// Convert an average time per frame (100 ns units) to frames per second.
pub fn fps_from_frame_interval(avg_time_per_frame: i64) -> f64 {
    if avg_time_per_frame > 0 {
        REFERENCE_TIME_PER_SECOND / avg_time_per_frame as f64
    } else {
        0.0
    }
}

fn unavailable(failures: &mut Vec<SoftFailure>, reason: String) {
    let failure = SoftFailure::StatsUnavailable(reason);
    failure.log();
    failures.push(failure);
}
