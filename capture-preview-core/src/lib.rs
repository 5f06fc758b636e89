//! # capture-preview-core
//!
//! Platform-agnostic core of a low-latency capture preview.
//!
//! Builds a video preview pipeline (device source → windowless renderer bound
//! to a host surface) and an audio monitor pipeline (device source → default
//! audio output), keeps them on one dedicated worker thread, and reports live
//! statistics. Platform backends (Windows DirectShow) implement the
//! `MediaBackend` trait and plug into the generic `SessionManager`.
//!
//! ## Architecture
//!
//! ```text
//! capture-preview-core (this crate)
//! ├── traits/    ← MediaBackend, NativeHandle, SessionDelegate
//! ├── models/    ← PipelineError, SoftFailure, VideoFormat, TuningFlags, PreviewSettings, etc.
//! ├── catalog/   ← format listing and selection
//! ├── pipeline/  ← VideoPipeline, AudioPipeline, Owned handles
//! ├── stats/     ← counter sampling, FPS derivation, StatsPoller
//! └── session/   ← SessionManager (worker thread + command queue)
//! ```

pub mod catalog;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use catalog::{list_formats, normalize_capabilities, select_format};
pub use models::device::{DeviceCategory, DeviceIdentity};
pub use models::error::{NativeError, NativeResult, PipelineError, SoftFailure, TuningHint};
pub use models::format::{FormatPreference, RawCapability, VideoFormat};
pub use models::geometry::{DestinationRect, StatsCorner, SurfaceHandle};
pub use models::settings::PreviewSettings;
pub use models::state::{ActiveSession, SessionState};
pub use models::stats::{FrameCounters, FrameStatsSample, NativeVideoSize};
pub use models::tuning::TuningFlags;
pub use session::{Pending, SessionManager, StartRequest};
pub use stats::{derive_fps, fps_from_frame_interval, StatsPoller, StatsReadout, STATS_INTERVAL};
pub use traits::media_backend::{AspectMode, MediaBackend, MediaKind, NativeHandle, StreamCategory};
pub use traits::session_delegate::SessionDelegate;
