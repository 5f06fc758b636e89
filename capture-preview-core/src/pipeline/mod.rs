//! Pipeline construction and teardown.
//!
//! Both pipelines keep their handles in slots declared in reverse acquisition
//! order, so a build that fails halfway is unwound by the same teardown path a
//! normal stop uses.

pub mod audio;
pub mod owned;
pub mod video;

use crate::models::error::{NativeResult, SoftFailure, TuningHint};

pub use audio::AudioPipeline;
pub use owned::Owned;
pub use video::{VideoPipeline, VideoPipelineRequest};

/// Apply a best-effort step: failures become `TuningHintRejected`.
pub(crate) fn best_effort(hint: TuningHint, result: NativeResult<()>, failures: &mut Vec<SoftFailure>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            let failure = SoftFailure::TuningHintRejected { hint, error };
            failure.log();
            failures.push(failure);
            false
        }
    }
}
