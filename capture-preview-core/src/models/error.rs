use std::fmt;

use thiserror::Error;

use super::device::DeviceCategory;

/// Fatal errors surfaced to the caller of `start`.
///
/// Everything else that can go wrong in a pipeline is absorbed and reported
/// as a [`SoftFailure`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{category} device not found: {identity}")]
    DeviceNotFound {
        category: DeviceCategory,
        identity: String,
    },

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("pipeline error: {0}")]
    Other(String),
}

impl PipelineError {
    pub fn device_not_found(category: DeviceCategory, identity: impl fmt::Display) -> Self {
        Self::DeviceNotFound {
            category,
            identity: identity.to_string(),
        }
    }
}

impl From<NativeError> for PipelineError {
    fn from(err: NativeError) -> Self {
        Self::Other(err.to_string())
    }
}

/// A failed call into the native multimedia framework.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed{}: {message}", code_suffix(.code))]
pub struct NativeError {
    pub operation: &'static str,
    /// Framework status code (an HRESULT on Windows), when one exists.
    pub code: Option<i32>,
    pub message: String,
}

impl NativeError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: Some(code),
            message: message.into(),
        }
    }

    /// The capability asked for is not exposed by the object.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::new(operation, "interface not supported")
    }
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (0x{:08X})", c as u32))
        .unwrap_or_default()
}

pub type NativeResult<T> = Result<T, NativeError>;

/// Tuning hints the builder applies on a best-effort basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningHint {
    SingleStream,
    BorderColor,
    OutputRegion,
    PreferredFormat,
    MinimalBuffering,
    NoGraphClock,
}

impl fmt::Display for TuningHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleStream => "single stream",
            Self::BorderColor => "border color",
            Self::OutputRegion => "output region",
            Self::PreferredFormat => "preferred format",
            Self::MinimalBuffering => "minimal buffering",
            Self::NoGraphClock => "no graph clock",
        };
        f.write_str(name)
    }
}

/// Non-fatal failures. Logged and forwarded to the session delegate, never
/// returned to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SoftFailure {
    #[error("tuning hint rejected ({hint}): {error}")]
    TuningHintRejected { hint: TuningHint, error: NativeError },

    #[error("stats unavailable: {0}")]
    StatsUnavailable(String),

    #[error("release of {handle} failed: {error}")]
    ResourceReleaseFailed {
        handle: &'static str,
        error: NativeError,
    },
}

impl SoftFailure {
    /// Writes the failure to the log at the level its category calls for.
    pub fn log(&self) {
        match self {
            Self::TuningHintRejected { .. } | Self::ResourceReleaseFailed { .. } => {
                log::warn!("{}", self)
            }
            Self::StatsUnavailable(_) => log::debug!("{}", self),
        }
    }
}
