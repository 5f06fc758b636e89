//! # capture-preview-windows
//!
//! Windows DirectShow backend for capture-preview.
//!
//! Provides:
//! - `DirectShowBackend`: `MediaBackend` over filter graphs, the capture graph
//!   builder and the VMR-9 renderer in windowless mode
//! - `ComApartment`: single-threaded COM apartment for the worker thread
//! - `device_resolver`: capture device lookup by device path
//!
//! ## Usage
//! ```ignore
//! use capture_preview_core::{SessionManager, StartRequest};
//! use capture_preview_windows::DirectShowBackend;
//!
//! let manager = SessionManager::new(DirectShowBackend::new);
//! manager.start(StartRequest::new(video_path, audio_path, hwnd, rect)).wait()?;
//! ```

#[cfg(target_os = "windows")]
pub mod com;
#[cfg(target_os = "windows")]
pub mod device_resolver;
#[cfg(target_os = "windows")]
pub mod directshow;
#[cfg(target_os = "windows")]
mod guids;
#[cfg(target_os = "windows")]
mod media_type;

#[cfg(target_os = "windows")]
pub use com::ComApartment;
#[cfg(target_os = "windows")]
pub use directshow::DirectShowBackend;
