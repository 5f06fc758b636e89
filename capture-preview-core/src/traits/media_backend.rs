use crate::models::device::{DeviceCategory, DeviceIdentity};
use crate::models::error::NativeResult;
use crate::models::format::{RawCapability, VideoFormat};
use crate::models::geometry::{DestinationRect, SurfaceHandle};
use crate::models::stats::{FrameCounters, NativeVideoSize};

/// A native object that has to be given back to the framework explicitly.
pub trait NativeHandle {
    /// Release the object. Called exactly once per handle.
    fn release(self) -> NativeResult<()>;
}

/// Which output endpoint of a capture source a connection starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamCategory {
    Preview,
    Capture,
}

impl StreamCategory {
    /// Order in which a source's outputs are tried: the dedicated preview
    /// output when the device has one, else the capture output.
    pub const SOURCE_ORDER: [StreamCategory; 2] = [StreamCategory::Preview, StreamCategory::Capture];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

/// How the renderer fits the source picture into the destination region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectMode {
    Stretch,
    /// Preserve the source aspect ratio and pad with the border color.
    LetterBox,
}

/// Opaque black, as a 0x00BBGGRR color reference.
pub const BORDER_BLACK: u32 = 0x0000_0000;

/// Interface for a platform multimedia framework.
///
/// Implemented by:
/// - `DirectShowBackend` (Windows)
///
/// A backend is created on the session's worker thread and never leaves it,
/// so implementations may hold thread-affine state. Every method is a single
/// native call (or a tightly bound group of them); ordering, fallbacks and
/// rollback are decided by the pipeline builder.
pub trait MediaBackend {
    /// A resolved device, ready to be turned into a source node.
    type Device;
    type Graph: NativeHandle;
    type GraphBuilder: NativeHandle;
    type Source: NativeHandle;
    type Renderer: NativeHandle;
    /// Windowless control interface of a renderer.
    type RendererControl: NativeHandle;
    /// Run/stop control of a graph.
    type MediaControl: NativeHandle;

    /// Look up a capture device. `Ok(None)` when the identity does not resolve.
    fn resolve_device(
        &mut self,
        category: DeviceCategory,
        identity: &DeviceIdentity,
    ) -> NativeResult<Option<Self::Device>>;

    fn create_graph(&mut self) -> NativeResult<Self::Graph>;

    fn create_graph_builder(&mut self, graph: &Self::Graph) -> NativeResult<Self::GraphBuilder>;

    fn add_source(&mut self, graph: &Self::Graph, device: &Self::Device) -> NativeResult<Self::Source>;

    fn create_video_renderer(&mut self) -> NativeResult<Self::Renderer>;

    /// Switch the renderer to windowless rendering and return its control.
    fn enter_windowless_mode(&mut self, renderer: &Self::Renderer) -> NativeResult<Self::RendererControl>;

    fn limit_input_streams(&mut self, renderer: &Self::Renderer, streams: u32) -> NativeResult<()>;

    fn set_clipping_surface(
        &mut self,
        control: &Self::RendererControl,
        surface: SurfaceHandle,
    ) -> NativeResult<()>;

    fn set_border_color(&mut self, control: &Self::RendererControl, color: u32) -> NativeResult<()>;

    fn set_aspect_mode(&mut self, control: &Self::RendererControl, mode: AspectMode) -> NativeResult<()>;

    fn set_output_region(
        &mut self,
        control: &Self::RendererControl,
        rect: &DestinationRect,
    ) -> NativeResult<()>;

    fn add_renderer(&mut self, graph: &Self::Graph, renderer: &Self::Renderer) -> NativeResult<()>;

    /// The source's video capabilities in the order the device reports them,
    /// read from the first output in [`StreamCategory::SOURCE_ORDER`] that has any.
    fn stream_capabilities(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
    ) -> NativeResult<Vec<RawCapability>>;

    /// Make the source produce exactly `format`.
    fn commit_format(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        format: &VideoFormat,
    ) -> NativeResult<()>;

    /// Suggest an allocator buffer count on the source output that carries
    /// `media`, looked up in [`StreamCategory::SOURCE_ORDER`].
    fn suggest_buffer_count(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        media: MediaKind,
        buffers: u32,
    ) -> NativeResult<()>;

    /// Connect a source output to `sink`, or to the default renderer for
    /// `media` when `sink` is `None`.
    fn connect(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        stream: StreamCategory,
        media: MediaKind,
        sink: Option<&Self::Renderer>,
    ) -> NativeResult<()>;

    fn detach_reference_clock(&mut self, graph: &Self::Graph) -> NativeResult<()>;

    fn media_control(&mut self, graph: &Self::Graph) -> NativeResult<Self::MediaControl>;

    fn run(&mut self, control: &Self::MediaControl) -> NativeResult<()>;

    fn stop(&mut self, control: &Self::MediaControl) -> NativeResult<()>;

    /// Counters from the renderer's quality-reporting interface, `None` if it has none.
    fn quality_counters(&mut self, renderer: &Self::Renderer) -> NativeResult<Option<FrameCounters>>;

    /// Counters from a frame-drop reporting interface on the renderer or its
    /// input connection point, `None` if neither exposes one.
    fn dropped_frame_counters(&mut self, renderer: &Self::Renderer) -> NativeResult<Option<FrameCounters>>;

    fn native_video_size(&mut self, control: &Self::RendererControl) -> NativeResult<NativeVideoSize>;

    /// Average time per frame (100 ns units) of the source's committed format.
    fn current_frame_interval(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
    ) -> NativeResult<Option<i64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_output_is_tried_before_capture() {
        assert_eq!(
            StreamCategory::SOURCE_ORDER,
            [StreamCategory::Preview, StreamCategory::Capture]
        );
    }
}
