//! Live statistics: renderer counters, frame rate, negotiated size.

pub mod fps;
pub mod poller;
pub mod sampler;

pub use fps::{derive_fps, StatsReadout};
pub use poller::{StatsPoller, STATS_INTERVAL};
pub use sampler::fps_from_frame_interval;
