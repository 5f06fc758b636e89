use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::device::{DeviceCategory, DeviceIdentity};
use crate::models::error::{NativeError, NativeResult};
use crate::models::format::{RawCapability, VideoFormat};
use crate::models::geometry::{DestinationRect, SurfaceHandle};
use crate::models::stats::{FrameCounters, NativeVideoSize};
use crate::traits::media_backend::{AspectMode, MediaBackend, MediaKind, NativeHandle, StreamCategory};

/// What the fake framework knows and which calls it refuses.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub video_devices: Vec<String>,
    pub audio_devices: Vec<String>,
    pub capabilities: HashMap<String, Vec<RawCapability>>,
    /// Operation keys (as recorded in the journal, without arguments) that fail.
    pub failing: HashSet<String>,
    /// Handle kinds whose release fails.
    pub failing_releases: HashSet<String>,
    pub quality_counters: Option<FrameCounters>,
    /// Successive quality readings, one per call; `quality_counters` once drained.
    pub quality_sequence: VecDeque<FrameCounters>,
    pub dropped_counters: Option<FrameCounters>,
    pub native_size: NativeVideoSize,
    pub frame_interval: Option<i64>,
    /// Sleep inside `run`, to widen race windows in ordering tests.
    pub run_delay: Option<Duration>,
    /// Make backend construction fail.
    pub fail_init: bool,
}

impl FakeScript {
    pub fn with_devices(video: &[&str], audio: &[&str]) -> Self {
        Self {
            video_devices: video.iter().map(|s| s.to_string()).collect(),
            audio_devices: audio.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn fail(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn fail_release(mut self, kind: &str) -> Self {
        self.failing_releases.insert(kind.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct JournalState {
    calls: Vec<String>,
    live: HashSet<u64>,
    released: Vec<(u64, &'static str)>,
    double_releases: usize,
    threads: HashSet<thread::ThreadId>,
    next_id: u64,
}

/// Shared record of every call the fake framework received.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<JournalState>>);

impl Journal {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().calls.clone()
    }

    /// Kinds of released handles, in release order.
    pub fn released_kinds(&self) -> Vec<&'static str> {
        self.0.lock().released.iter().map(|(_, kind)| *kind).collect()
    }

    pub fn live_handles(&self) -> usize {
        self.0.lock().live.len()
    }

    pub fn double_releases(&self) -> usize {
        self.0.lock().double_releases
    }

    /// Number of distinct threads that called into the framework.
    pub fn thread_count(&self) -> usize {
        self.0.lock().threads.len()
    }

    pub fn clear(&self) {
        let mut state = self.0.lock();
        state.calls.clear();
        state.released.clear();
    }

    fn record(&self, call: String) {
        let mut state = self.0.lock();
        state.threads.insert(thread::current().id());
        state.calls.push(call);
    }

    fn acquire(&self) -> u64 {
        let mut state = self.0.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id);
        id
    }
}

/// A handle produced by the fake framework.
#[derive(Debug)]
pub struct FakeHandle {
    id: u64,
    kind: &'static str,
    fail_release: bool,
    journal: Journal,
}

impl NativeHandle for FakeHandle {
    fn release(self) -> NativeResult<()> {
        let mut state = self.journal.0.lock();
        if !state.live.remove(&self.id) {
            state.double_releases += 1;
        }
        state.released.push((self.id, self.kind));
        state.calls.push(format!("release {}", self.kind));
        if self.fail_release {
            Err(NativeError::new("Release", format!("{} refused release", self.kind)))
        } else {
            Ok(())
        }
    }
}

pub struct FakeBackend {
    script: FakeScript,
    journal: Journal,
}

impl FakeBackend {
    pub fn new(script: FakeScript, journal: Journal) -> NativeResult<Self> {
        if script.fail_init {
            return Err(NativeError::with_code("CoInitializeEx", 0x8001_0106_u32 as i32, "apartment mismatch"));
        }
        Ok(Self { script, journal })
    }

    fn call(&self, key: &str, detail: Option<&str>) -> NativeResult<()> {
        match detail {
            Some(d) => self.journal.record(format!("{} {}", key, d)),
            None => self.journal.record(key.to_string()),
        }
        if self.script.failing.contains(key) {
            Err(NativeError::with_code(
                "fake",
                0x8000_4005_u32 as i32,
                format!("{} refused", key),
            ))
        } else {
            Ok(())
        }
    }

    fn handle(&self, kind: &'static str) -> FakeHandle {
        FakeHandle {
            id: self.journal.acquire(),
            kind,
            fail_release: self.script.failing_releases.contains(kind),
            journal: self.journal.clone(),
        }
    }
}

impl MediaBackend for FakeBackend {
    type Device = String;
    type Graph = FakeHandle;
    type GraphBuilder = FakeHandle;
    type Source = FakeHandle;
    type Renderer = FakeHandle;
    type RendererControl = FakeHandle;
    type MediaControl = FakeHandle;

    fn resolve_device(
        &mut self,
        category: DeviceCategory,
        identity: &DeviceIdentity,
    ) -> NativeResult<Option<String>> {
        self.call("resolve_device", Some(identity.as_str()))?;
        let known = match category {
            DeviceCategory::Video => &self.script.video_devices,
            DeviceCategory::Audio => &self.script.audio_devices,
        };
        Ok(known.iter().find(|d| identity.matches(d)).cloned())
    }

    fn create_graph(&mut self) -> NativeResult<FakeHandle> {
        self.call("create_graph", None)?;
        Ok(self.handle("graph"))
    }

    fn create_graph_builder(&mut self, _graph: &FakeHandle) -> NativeResult<FakeHandle> {
        self.call("create_graph_builder", None)?;
        Ok(self.handle("graph builder"))
    }

    fn add_source(&mut self, _graph: &FakeHandle, device: &String) -> NativeResult<FakeHandle> {
        self.call("add_source", Some(device))?;
        Ok(self.handle("source"))
    }

    fn create_video_renderer(&mut self) -> NativeResult<FakeHandle> {
        self.call("create_video_renderer", None)?;
        Ok(self.handle("renderer"))
    }

    fn enter_windowless_mode(&mut self, _renderer: &FakeHandle) -> NativeResult<FakeHandle> {
        self.call("enter_windowless_mode", None)?;
        Ok(self.handle("renderer control"))
    }

    fn limit_input_streams(&mut self, _renderer: &FakeHandle, streams: u32) -> NativeResult<()> {
        self.call("limit_input_streams", Some(&streams.to_string()))
    }

    fn set_clipping_surface(&mut self, _control: &FakeHandle, surface: SurfaceHandle) -> NativeResult<()> {
        self.call("set_clipping_surface", Some(&surface.raw().to_string()))
    }

    fn set_border_color(&mut self, _control: &FakeHandle, color: u32) -> NativeResult<()> {
        self.call("set_border_color", Some(&format!("{:06X}", color)))
    }

    fn set_aspect_mode(&mut self, _control: &FakeHandle, mode: AspectMode) -> NativeResult<()> {
        self.call("set_aspect_mode", Some(&format!("{:?}", mode)))
    }

    fn set_output_region(&mut self, _control: &FakeHandle, rect: &DestinationRect) -> NativeResult<()> {
        self.call(
            "set_output_region",
            Some(&format!("{},{},{},{}", rect.left, rect.top, rect.right, rect.bottom)),
        )
    }

    fn add_renderer(&mut self, _graph: &FakeHandle, _renderer: &FakeHandle) -> NativeResult<()> {
        self.call("add_renderer", None)
    }

    fn stream_capabilities(
        &mut self,
        _builder: &FakeHandle,
        _source: &FakeHandle,
    ) -> NativeResult<Vec<RawCapability>> {
        self.call("stream_capabilities", None)?;
        // The source was added from the last resolved device.
        let device = self
            .journal
            .calls()
            .iter()
            .rev()
            .find_map(|c| c.strip_prefix("add_source ").map(str::to_string))
            .unwrap_or_default();
        Ok(self.script.capabilities.get(&device).cloned().unwrap_or_default())
    }

    fn commit_format(
        &mut self,
        _builder: &FakeHandle,
        _source: &FakeHandle,
        format: &VideoFormat,
    ) -> NativeResult<()> {
        self.call("commit_format", Some(&format.to_string()))
    }

    fn suggest_buffer_count(
        &mut self,
        _builder: &FakeHandle,
        _source: &FakeHandle,
        media: MediaKind,
        buffers: u32,
    ) -> NativeResult<()> {
        let media = match media {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        self.call("suggest_buffer_count", Some(&format!("{} {}", media, buffers)))
    }

    fn connect(
        &mut self,
        _builder: &FakeHandle,
        _source: &FakeHandle,
        stream: StreamCategory,
        media: MediaKind,
        sink: Option<&FakeHandle>,
    ) -> NativeResult<()> {
        let key = match (stream, media) {
            (StreamCategory::Preview, MediaKind::Video) => "connect:preview",
            (StreamCategory::Capture, MediaKind::Video) => "connect:capture",
            (_, MediaKind::Audio) => "connect:audio",
        };
        let target = if sink.is_some() { "renderer" } else { "default sink" };
        self.call(key, Some(target))
    }

    fn detach_reference_clock(&mut self, _graph: &FakeHandle) -> NativeResult<()> {
        self.call("detach_reference_clock", None)
    }

    fn media_control(&mut self, _graph: &FakeHandle) -> NativeResult<FakeHandle> {
        self.call("media_control", None)?;
        Ok(self.handle("media control"))
    }

    fn run(&mut self, _control: &FakeHandle) -> NativeResult<()> {
        if let Some(delay) = self.script.run_delay {
            thread::sleep(delay);
        }
        self.call("run", None)
    }

    fn stop(&mut self, _control: &FakeHandle) -> NativeResult<()> {
        self.call("stop", None)
    }

    fn quality_counters(&mut self, _renderer: &FakeHandle) -> NativeResult<Option<FrameCounters>> {
        self.call("quality_counters", None)?;
        Ok(self.script.quality_sequence.pop_front().or(self.script.quality_counters))
    }

    fn dropped_frame_counters(&mut self, _renderer: &FakeHandle) -> NativeResult<Option<FrameCounters>> {
        self.call("dropped_frame_counters", None)?;
        Ok(self.script.dropped_counters)
    }

    fn native_video_size(&mut self, _control: &FakeHandle) -> NativeResult<NativeVideoSize> {
        self.call("native_video_size", None)?;
        Ok(self.script.native_size)
    }

    fn current_frame_interval(
        &mut self,
        _builder: &FakeHandle,
        _source: &FakeHandle,
    ) -> NativeResult<Option<i64>> {
        self.call("current_frame_interval", None)?;
        Ok(self.script.frame_interval)
    }
}
