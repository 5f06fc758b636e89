pub mod device;
pub mod error;
pub mod format;
pub mod geometry;
pub mod settings;
pub mod state;
pub mod stats;
pub mod tuning;
