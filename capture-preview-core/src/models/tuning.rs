use serde::{Deserialize, Serialize};

/// Construction-time pipeline hints.
///
/// Applied once per build. A running pipeline never picks up new values;
/// changing them means stopping and starting again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningFlags {
    /// Limit the renderer to a single input stream (skips mixer overhead).
    pub single_stream: bool,
    /// Ask source output endpoints for the smallest buffer count.
    pub minimal_buffering: bool,
    /// Run the video graph without a reference clock.
    pub no_graph_clock: bool,
}

impl TuningFlags {
    /// Buffer count suggested to source endpoints when `minimal_buffering` is set.
    pub const MINIMAL_BUFFER_COUNT: u32 = 2;

    pub const NONE: Self = Self {
        single_stream: false,
        minimal_buffering: false,
        no_graph_clock: false,
    };

    pub const LOW_LATENCY: Self = Self {
        single_stream: true,
        minimal_buffering: true,
        no_graph_clock: true,
    };
}

impl Default for TuningFlags {
    fn default() -> Self {
        Self::LOW_LATENCY
    }
}
