use crate::models::error::{PipelineError, SoftFailure};
use crate::models::state::SessionState;

/// Event delegate for session notifications.
///
/// All methods are called from the pipeline worker thread. Implementations
/// should marshal to the UI thread if needed and must not block.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: SessionState);

    /// Called for every non-fatal failure (rejected hints, failed releases, missing stats).
    fn on_soft_failure(&self, _failure: &SoftFailure) {}

    /// Called when a start fails, after everything it built has been released.
    fn on_start_failed(&self, _error: &PipelineError) {}
}
