//! DirectShow implementation of the core `MediaBackend`.
//!
//! Every handle is a COM interface wrapper; releasing it drops the last
//! reference the pipeline holds. The backend owns the worker thread's COM
//! apartment and must be created and used on that thread only.

use std::ffi::c_void;

use windows::core::{w, Interface, GUID};
use windows::Win32::Foundation::{COLORREF, E_NOINTERFACE, E_POINTER, HWND, RECT};
use windows::Win32::Media::DirectShow::{
    IAMBufferNegotiation, IAMDroppedFrames, IAMStreamConfig, IBaseFilter, ICaptureGraphBuilder2, IEnumPins,
    IGraphBuilder, IMediaControl, IMediaFilter, IPin, IQualProp, IVMRFilterConfig9, IVMRWindowlessControl9,
    ALLOCATOR_PROPERTIES, PINDIR_INPUT, PIN_DIRECTION, VMR9ARMode_LetterBox, VMR9ARMode_None,
    VMR9Mode_Windowless,
};
use windows::Win32::Media::MediaFoundation::AM_MEDIA_TYPE;
use windows::Win32::System::Com::{CoCreateInstance, IMoniker, CLSCTX_INPROC_SERVER};

use capture_preview_core::models::device::{DeviceCategory, DeviceIdentity};
use capture_preview_core::models::error::{NativeError, NativeResult};
use capture_preview_core::models::format::{RawCapability, VideoFormat};
use capture_preview_core::models::geometry::{DestinationRect, SurfaceHandle};
use capture_preview_core::models::stats::{FrameCounters, NativeVideoSize};
use capture_preview_core::traits::media_backend::{
    AspectMode, MediaBackend, MediaKind, NativeHandle, StreamCategory,
};

use crate::com::{com_error, ComApartment};
use crate::device_resolver::DeviceResolver;
use crate::guids::*;
use crate::media_type::MediaType;

/// A COM interface held by a pipeline.
pub struct Com<T: Interface>(T);

impl<T: Interface> Com<T> {
    pub fn interface(&self) -> &T {
        &self.0
    }
}

impl<T: Interface> NativeHandle for Com<T> {
    fn release(self) -> NativeResult<()> {
        // COM `Release` has no failure path.
        drop(self.0);
        Ok(())
    }
}

/// DirectShow filter graphs driven through the capture graph builder.
pub struct DirectShowBackend {
    resolver: DeviceResolver,
    // Dropped last: every interface above belongs to this apartment.
    _apartment: ComApartment,
}

impl DirectShowBackend {
    /// Enter an STA on the current thread and create the device enumerator.
    pub fn new() -> NativeResult<Self> {
        let apartment = ComApartment::enter()?;
        let resolver = DeviceResolver::new()?;
        log::info!("DirectShow backend ready");
        Ok(Self {
            resolver,
            _apartment: apartment,
        })
    }
}

fn create<T: Interface>(clsid: &GUID, operation: &'static str) -> NativeResult<T> {
    unsafe { CoCreateInstance(clsid, None, CLSCTX_INPROC_SERVER).map_err(|e| com_error(operation, e)) }
}

fn cast<T: Interface, U: Interface>(from: &U, operation: &'static str) -> NativeResult<T> {
    from.cast::<T>().map_err(|e| com_error(operation, e))
}

fn pin_category(stream: StreamCategory) -> &'static GUID {
    match stream {
        StreamCategory::Preview => &PIN_CATEGORY_PREVIEW,
        StreamCategory::Capture => &PIN_CATEGORY_CAPTURE,
    }
}

fn media_type_guid(media: MediaKind) -> &'static GUID {
    match media {
        MediaKind::Video => &MEDIATYPE_VIDEO,
        MediaKind::Audio => &MEDIATYPE_AUDIO,
    }
}

/// Interface `T` on the source output carrying `media`: the preview output
/// when the device has one, else the capture output.
fn find_on_source<T: Interface>(
    builder: &ICaptureGraphBuilder2,
    source: &IBaseFilter,
    media: MediaKind,
    operation: &'static str,
) -> NativeResult<T> {
    let mut last_error: windows::core::Error = E_NOINTERFACE.into();
    for stream in StreamCategory::SOURCE_ORDER {
        let mut found: Option<T> = None;
        let result = unsafe {
            builder.FindInterface(
                Some(pin_category(stream)),
                Some(media_type_guid(media)),
                source,
                &T::IID,
                &mut found as *mut _ as *mut *mut c_void,
            )
        };
        match (result, found) {
            (Ok(()), Some(found)) => return Ok(found),
            (Err(e), _) => last_error = e,
            (Ok(()), None) => {}
        }
    }
    Err(com_error(operation, last_error))
}

/// `IAMStreamConfig` on the source output that is rendered.
fn stream_config(builder: &ICaptureGraphBuilder2, source: &IBaseFilter) -> NativeResult<IAMStreamConfig> {
    find_on_source(builder, source, MediaKind::Video, "FindInterface(IAMStreamConfig)")
}

/// Every stream capability of a source, in device order.
fn capabilities(config: &IAMStreamConfig) -> NativeResult<Vec<MediaType>> {
    unsafe {
        let mut count = 0i32;
        let mut size = 0i32;
        config
            .GetNumberOfCapabilities(&mut count, &mut size)
            .map_err(|e| com_error("GetNumberOfCapabilities", e))?;

        // VIDEO_STREAM_CONFIG_CAPS scratch space, contents unused.
        let mut caps = vec![0u8; size.max(0) as usize];
        let mut types = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let mut raw: *mut AM_MEDIA_TYPE = std::ptr::null_mut();
            if let Err(e) = config.GetStreamCaps(index, &mut raw, caps.as_mut_ptr()) {
                log::debug!("GetStreamCaps({}) failed: {}", index, e);
                continue;
            }
            if let Some(media_type) = MediaType::from_raw(raw) {
                types.push(media_type);
            }
        }
        Ok(types)
    }
}

fn pins(filter: &IBaseFilter, wanted: PIN_DIRECTION) -> NativeResult<Vec<IPin>> {
    unsafe {
        let enum_pins: IEnumPins = filter.EnumPins().map_err(|e| com_error("EnumPins", e))?;
        let mut found = Vec::new();
        loop {
            let mut slot: [Option<IPin>; 1] = [None];
            let mut fetched = 0u32;
            if enum_pins.Next(&mut slot, Some(&mut fetched)).is_err() || fetched == 0 {
                break;
            }
            if let Some(pin) = slot[0].take() {
                if pin.QueryDirection().is_ok_and(|direction| direction == wanted) {
                    found.push(pin);
                }
            }
        }
        Ok(found)
    }
}

impl MediaBackend for DirectShowBackend {
    type Device = IMoniker;
    type Graph = Com<IGraphBuilder>;
    type GraphBuilder = Com<ICaptureGraphBuilder2>;
    type Source = Com<IBaseFilter>;
    type Renderer = Com<IBaseFilter>;
    type RendererControl = Com<IVMRWindowlessControl9>;
    type MediaControl = Com<IMediaControl>;

    fn resolve_device(
        &mut self,
        category: DeviceCategory,
        identity: &DeviceIdentity,
    ) -> NativeResult<Option<IMoniker>> {
        self.resolver.resolve(category, identity)
    }

    fn create_graph(&mut self) -> NativeResult<Self::Graph> {
        create(&CLSID_FILTER_GRAPH, "CoCreateInstance(FilterGraph)").map(Com)
    }

    fn create_graph_builder(&mut self, graph: &Self::Graph) -> NativeResult<Self::GraphBuilder> {
        let builder: ICaptureGraphBuilder2 = create(&CLSID_CAPTURE_GRAPH_BUILDER2, "CoCreateInstance(CaptureGraphBuilder2)")?;
        unsafe {
            builder
                .SetFiltergraph(graph.interface())
                .map_err(|e| com_error("SetFiltergraph", e))?;
        }
        Ok(Com(builder))
    }

    fn add_source(&mut self, graph: &Self::Graph, device: &IMoniker) -> NativeResult<Self::Source> {
        unsafe {
            let mut filter: Option<IBaseFilter> = None;
            device
                .BindToObject(None, None, &IBaseFilter::IID, &mut filter as *mut _ as *mut *mut c_void)
                .map_err(|e| com_error("BindToObject", e))?;
            let filter = filter.ok_or_else(|| com_error("BindToObject", E_POINTER.into()))?;
            graph
                .interface()
                .AddFilter(&filter, w!("Capture Source"))
                .map_err(|e| com_error("AddFilter(source)", e))?;
            Ok(Com(filter))
        }
    }

    fn create_video_renderer(&mut self) -> NativeResult<Self::Renderer> {
        create(&CLSID_VIDEO_MIXING_RENDERER9, "CoCreateInstance(VMR9)").map(Com)
    }

    fn enter_windowless_mode(&mut self, renderer: &Self::Renderer) -> NativeResult<Self::RendererControl> {
        let config: IVMRFilterConfig9 = cast(renderer.interface(), "QueryInterface(IVMRFilterConfig9)")?;
        unsafe {
            config
                .SetRenderingMode(VMR9Mode_Windowless.0 as u32)
                .map_err(|e| com_error("SetRenderingMode", e))?;
        }
        cast(renderer.interface(), "QueryInterface(IVMRWindowlessControl9)").map(Com)
    }

    fn limit_input_streams(&mut self, renderer: &Self::Renderer, streams: u32) -> NativeResult<()> {
        let config: IVMRFilterConfig9 = cast(renderer.interface(), "QueryInterface(IVMRFilterConfig9)")?;
        unsafe { config.SetNumberOfStreams(streams).map_err(|e| com_error("SetNumberOfStreams", e)) }
    }

    fn set_clipping_surface(&mut self, control: &Self::RendererControl, surface: SurfaceHandle) -> NativeResult<()> {
        unsafe {
            control
                .interface()
                .SetVideoClippingWindow(HWND(surface.raw() as *mut c_void))
                .map_err(|e| com_error("SetVideoClippingWindow", e))
        }
    }

    fn set_border_color(&mut self, control: &Self::RendererControl, color: u32) -> NativeResult<()> {
        unsafe {
            control
                .interface()
                .SetBorderColor(COLORREF(color))
                .map_err(|e| com_error("SetBorderColor", e))
        }
    }

    fn set_aspect_mode(&mut self, control: &Self::RendererControl, mode: AspectMode) -> NativeResult<()> {
        let mode = match mode {
            AspectMode::Stretch => VMR9ARMode_None,
            AspectMode::LetterBox => VMR9ARMode_LetterBox,
        };
        unsafe {
            control
                .interface()
                .SetAspectRatioMode(mode.0 as u32)
                .map_err(|e| com_error("SetAspectRatioMode", e))
        }
    }

    fn set_output_region(&mut self, control: &Self::RendererControl, rect: &DestinationRect) -> NativeResult<()> {
        let destination = RECT {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        };
        unsafe {
            control
                .interface()
                .SetVideoPosition(std::ptr::null(), &destination)
                .map_err(|e| com_error("SetVideoPosition", e))
        }
    }

    fn add_renderer(&mut self, graph: &Self::Graph, renderer: &Self::Renderer) -> NativeResult<()> {
        unsafe {
            graph
                .interface()
                .AddFilter(renderer.interface(), w!("VMR9"))
                .map_err(|e| com_error("AddFilter(renderer)", e))
        }
    }

    fn stream_capabilities(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
    ) -> NativeResult<Vec<RawCapability>> {
        let config = stream_config(builder.interface(), source.interface())?;
        Ok(capabilities(&config)?
            .iter()
            .filter_map(MediaType::video_capability)
            .collect())
    }

    fn commit_format(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        format: &VideoFormat,
    ) -> NativeResult<()> {
        let config = stream_config(builder.interface(), source.interface())?;
        let types = capabilities(&config)?;
        let chosen = types
            .iter()
            .find(|mt| {
                mt.video_capability()
                    .and_then(|cap| cap.to_format())
                    .is_some_and(|candidate| candidate == *format)
            })
            .ok_or_else(|| NativeError::new("SetFormat", format!("{} not offered by the device", format)))?;
        unsafe {
            config
                .SetFormat(chosen.as_ptr())
                .map_err(|e| com_error("SetFormat", e))
        }
    }

    fn suggest_buffer_count(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        media: MediaKind,
        buffers: u32,
    ) -> NativeResult<()> {
        let properties = ALLOCATOR_PROPERTIES {
            cBuffers: buffers as i32,
            cbBuffer: -1,
            cbAlign: -1,
            cbPrefix: -1,
        };
        let negotiation: IAMBufferNegotiation = find_on_source(
            builder.interface(),
            source.interface(),
            media,
            "FindInterface(IAMBufferNegotiation)",
        )?;
        unsafe {
            negotiation
                .SuggestAllocatorProperties(&properties)
                .map_err(|e| com_error("SuggestAllocatorProperties", e))
        }
    }

    fn connect(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
        stream: StreamCategory,
        media: MediaKind,
        sink: Option<&Self::Renderer>,
    ) -> NativeResult<()> {
        unsafe {
            builder
                .interface()
                .RenderStream(
                    Some(pin_category(stream)),
                    Some(media_type_guid(media)),
                    source.interface(),
                    None,
                    sink.map(Com::interface),
                )
                .map_err(|e| com_error("RenderStream", e))
        }
    }

    fn detach_reference_clock(&mut self, graph: &Self::Graph) -> NativeResult<()> {
        let filter: IMediaFilter = cast(graph.interface(), "QueryInterface(IMediaFilter)")?;
        unsafe { filter.SetSyncSource(None).map_err(|e| com_error("SetSyncSource", e)) }
    }

    fn media_control(&mut self, graph: &Self::Graph) -> NativeResult<Self::MediaControl> {
        cast(graph.interface(), "QueryInterface(IMediaControl)").map(Com)
    }

    fn run(&mut self, control: &Self::MediaControl) -> NativeResult<()> {
        unsafe { control.interface().Run().map_err(|e| com_error("IMediaControl::Run", e)) }
    }

    fn stop(&mut self, control: &Self::MediaControl) -> NativeResult<()> {
        unsafe { control.interface().Stop().map_err(|e| com_error("IMediaControl::Stop", e)) }
    }

    fn quality_counters(&mut self, renderer: &Self::Renderer) -> NativeResult<Option<FrameCounters>> {
        let Ok(quality) = renderer.interface().cast::<IQualProp>() else {
            return Ok(None);
        };
        unsafe {
            let dropped = quality
                .FramesDroppedInRenderer()
                .map_err(|e| com_error("FramesDroppedInRenderer", e))?;
            let drawn = quality.FramesDrawn().map_err(|e| com_error("FramesDrawn", e))?;
            Ok(Some(FrameCounters { dropped, drawn }))
        }
    }

    fn dropped_frame_counters(&mut self, renderer: &Self::Renderer) -> NativeResult<Option<FrameCounters>> {
        let filter = renderer.interface();
        let reporter = match filter.cast::<IAMDroppedFrames>() {
            Ok(reporter) => Some(reporter),
            Err(_) => pins(filter, PINDIR_INPUT)?
                .iter()
                .find_map(|pin| pin.cast::<IAMDroppedFrames>().ok()),
        };
        let Some(reporter) = reporter else {
            return Ok(None);
        };
        unsafe {
            let dropped = reporter.GetNumDropped().map_err(|e| com_error("GetNumDropped", e))?;
            let drawn = reporter
                .GetNumNotDropped()
                .map_err(|e| com_error("GetNumNotDropped", e))?;
            Ok(Some(FrameCounters { dropped, drawn }))
        }
    }

    fn native_video_size(&mut self, control: &Self::RendererControl) -> NativeResult<NativeVideoSize> {
        let mut width = 0i32;
        let mut height = 0i32;
        unsafe {
            control
                .interface()
                .GetNativeVideoSize(&mut width, &mut height, std::ptr::null_mut(), std::ptr::null_mut())
                .map_err(|e| com_error("GetNativeVideoSize", e))?;
        }
        Ok(NativeVideoSize { width, height })
    }

    fn current_frame_interval(
        &mut self,
        builder: &Self::GraphBuilder,
        source: &Self::Source,
    ) -> NativeResult<Option<i64>> {
        let config = stream_config(builder.interface(), source.interface())?;
        let current = unsafe {
            let raw = config.GetFormat().map_err(|e| com_error("GetFormat", e))?;
            MediaType::from_raw(raw)
        };
        Ok(current
            .and_then(|mt| mt.video_capability())
            .map(|cap| cap.avg_time_per_frame)
            .filter(|interval| *interval > 0))
    }
}
