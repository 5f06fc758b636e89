use crate::catalog::format_catalog;
use crate::models::device::{DeviceCategory, DeviceIdentity};
use crate::models::error::{PipelineError, SoftFailure, TuningHint};
use crate::models::format::{FormatPreference, VideoFormat};
use crate::models::geometry::{DestinationRect, SurfaceHandle};
use crate::models::tuning::TuningFlags;
use crate::traits::media_backend::{AspectMode, MediaBackend, MediaKind, StreamCategory, BORDER_BLACK};

use super::best_effort;
use super::owned::{release_slot, Owned};

/// Everything needed to build the preview pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPipelineRequest {
    pub device: DeviceIdentity,
    pub surface: SurfaceHandle,
    pub initial_rect: DestinationRect,
    pub tuning: TuningFlags,
    pub preferred_format: FormatPreference,
}

/// A running (or partially built) video preview pipeline:
/// source → renderer, drawn windowless into the caller's surface.
///
/// Slots are declared in reverse acquisition order.
pub struct VideoPipeline<B: MediaBackend> {
    media_control: Option<Owned<B::MediaControl>>,
    renderer_control: Option<Owned<B::RendererControl>>,
    renderer: Option<Owned<B::Renderer>>,
    source: Option<Owned<B::Source>>,
    graph_builder: Option<Owned<B::GraphBuilder>>,
    graph: Option<Owned<B::Graph>>,
    committed_format: Option<VideoFormat>,
}

impl<B: MediaBackend> VideoPipeline<B> {
    fn empty() -> Self {
        Self {
            media_control: None,
            renderer_control: None,
            renderer: None,
            source: None,
            graph_builder: None,
            graph: None,
            committed_format: None,
        }
    }

    /// Build and start the preview pipeline.
    ///
    /// On failure everything created so far is released in reverse order
    /// before the error is returned. Best-effort steps that fail are appended
    /// to `failures`.
    pub fn build(
        backend: &mut B,
        request: &VideoPipelineRequest,
        failures: &mut Vec<SoftFailure>,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self::empty();
        match pipeline.construct(backend, request, failures) {
            Ok(()) => Ok(pipeline),
            Err(err) => {
                log::warn!("video pipeline build failed, rolling back: {}", err);
                pipeline.teardown(backend, failures);
                Err(err)
            }
        }
    }

    fn construct(
        &mut self,
        backend: &mut B,
        request: &VideoPipelineRequest,
        failures: &mut Vec<SoftFailure>,
    ) -> Result<(), PipelineError> {
        // 1. Graph and device source
        let graph = self.graph.insert(Owned::new("video graph", backend.create_graph()?));
        let builder = self
            .graph_builder
            .insert(Owned::new("video graph builder", backend.create_graph_builder(graph.get())?));

        let device = resolve(backend, DeviceCategory::Video, &request.device)?;
        let source = self
            .source
            .insert(Owned::new("video source", backend.add_source(graph.get(), &device)?));

        // 2. Windowless renderer bound to the caller's surface
        let renderer = self
            .renderer
            .insert(Owned::new("video renderer", backend.create_video_renderer()?));
        let control = self.renderer_control.insert(Owned::new(
            "renderer control",
            backend.enter_windowless_mode(renderer.get())?,
        ));
        if request.tuning.single_stream {
            best_effort(
                TuningHint::SingleStream,
                backend.limit_input_streams(renderer.get(), 1),
                failures,
            );
        }
        backend.set_clipping_surface(control.get(), request.surface)?;

        // 3. Black letterbox and the initial region
        best_effort(
            TuningHint::BorderColor,
            backend.set_border_color(control.get(), BORDER_BLACK),
            failures,
        );
        backend.set_aspect_mode(control.get(), AspectMode::LetterBox)?;
        best_effort(
            TuningHint::OutputRegion,
            backend.set_output_region(control.get(), &request.initial_rect),
            failures,
        );

        // 4.
        backend.add_renderer(graph.get(), renderer.get())?;

        // 5. Preferred format, before any pin is connected
        if !request.preferred_format.is_auto() {
            self.committed_format = commit_preferred_format(
                backend,
                builder.get(),
                source.get(),
                &request.preferred_format,
                failures,
            );
        }

        // 6.
        if request.tuning.minimal_buffering {
            best_effort(
                TuningHint::MinimalBuffering,
                backend.suggest_buffer_count(
                    builder.get(),
                    source.get(),
                    MediaKind::Video,
                    TuningFlags::MINIMAL_BUFFER_COUNT,
                ),
                failures,
            );
        }

        // 7. Preview output first, capture output as fallback
        let mut last_error = None;
        for stream in StreamCategory::SOURCE_ORDER {
            match backend.connect(builder.get(), source.get(), stream, MediaKind::Video, Some(renderer.get())) {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    log::debug!("{:?} output not connectable: {}", stream, e);
                    last_error = Some(e);
                }
            }
        }
        if let Some(e) = last_error {
            return Err(PipelineError::ConnectionFailed(format!("video source to renderer: {}", e)));
        }

        // 8.
        if request.tuning.no_graph_clock {
            best_effort(
                TuningHint::NoGraphClock,
                backend.detach_reference_clock(graph.get()),
                failures,
            );
        }

        // 9.
        let control = self
            .media_control
            .insert(Owned::new("video media control", backend.media_control(graph.get())?));
        backend.run(control.get())?;

        log::info!(
            "video pipeline running: device={} format={}",
            request.device,
            self.committed_format
                .map(|f| f.to_string())
                .unwrap_or_else(|| "device default".into())
        );
        Ok(())
    }

    /// Stop media flow and release every handle in reverse acquisition order.
    ///
    /// Safe on a partially built pipeline; never fails.
    pub fn teardown(self, backend: &mut B, failures: &mut Vec<SoftFailure>) {
        self.halt(backend);
        self.release(failures);
    }

    /// Stop media flow. Best-effort.
    pub fn halt(&self, backend: &mut B) {
        if let Some(control) = &self.media_control {
            if let Err(e) = backend.stop(control.get()) {
                log::debug!("video graph stop failed: {}", e);
            }
        }
    }

    /// Release every handle: renderer control, renderer, source, graph
    /// builder, graph (media control first, it was acquired last).
    pub fn release(mut self, failures: &mut Vec<SoftFailure>) {
        release_slot(&mut self.media_control, failures);
        release_slot(&mut self.renderer_control, failures);
        release_slot(&mut self.renderer, failures);
        release_slot(&mut self.source, failures);
        release_slot(&mut self.graph_builder, failures);
        release_slot(&mut self.graph, failures);
    }

    /// Apply a new destination region to the live renderer.
    pub fn set_output_region(&self, backend: &mut B, rect: &DestinationRect) -> Result<(), SoftFailure> {
        let Some(control) = &self.renderer_control else {
            return Ok(());
        };
        backend
            .set_output_region(control.get(), rect)
            .map_err(|error| SoftFailure::TuningHintRejected {
                hint: TuningHint::OutputRegion,
                error,
            })
    }

    pub fn committed_format(&self) -> Option<VideoFormat> {
        self.committed_format
    }

    pub fn renderer(&self) -> Option<&B::Renderer> {
        self.renderer.as_ref().map(Owned::get)
    }

    pub fn renderer_control(&self) -> Option<&B::RendererControl> {
        self.renderer_control.as_ref().map(Owned::get)
    }

    pub fn graph_builder(&self) -> Option<&B::GraphBuilder> {
        self.graph_builder.as_ref().map(Owned::get)
    }

    pub fn source(&self) -> Option<&B::Source> {
        self.source.as_ref().map(Owned::get)
    }
}

/// Resolve a device identity, mapping both "absent" and "lookup failed" to
/// `DeviceNotFound`.
pub(crate) fn resolve<B: MediaBackend>(
    backend: &mut B,
    category: DeviceCategory,
    identity: &DeviceIdentity,
) -> Result<B::Device, PipelineError> {
    match backend.resolve_device(category, identity) {
        Ok(Some(device)) => Ok(device),
        Ok(None) => Err(PipelineError::device_not_found(category, identity)),
        Err(e) => {
            log::warn!("{} device lookup failed: {}", category, e);
            Err(PipelineError::device_not_found(category, identity))
        }
    }
}

/// Pick the best capability for `preference` and commit it on the source.
///
/// Returns the committed format, or `None` when the device default stays in
/// effect (no exact resolution match, or the device refused the format).
fn commit_preferred_format<B: MediaBackend>(
    backend: &mut B,
    builder: &B::GraphBuilder,
    source: &B::Source,
    preference: &FormatPreference,
    failures: &mut Vec<SoftFailure>,
) -> Option<VideoFormat> {
    let capabilities = match backend.stream_capabilities(builder, source) {
        Ok(caps) => caps,
        Err(error) => {
            best_effort(TuningHint::PreferredFormat, Err(error), failures);
            return None;
        }
    };
    let candidates: Vec<VideoFormat> = capabilities.iter().filter_map(|c| c.to_format()).collect();

    let Some(chosen) = format_catalog::select_format(&candidates, preference) else {
        log::info!("no capability matches preferred format {}, using device default", preference);
        return None;
    };

    if best_effort(
        TuningHint::PreferredFormat,
        backend.commit_format(builder, source, &chosen),
        failures,
    ) {
        Some(chosen)
    } else {
        None
    }
}

impl<B: MediaBackend> Drop for VideoPipeline<B> {
    fn drop(&mut self) {
        // `teardown` empties every slot; anything left here is released by
        // the slots' own drop, in declaration order.
        if self.graph.is_some() {
            log::debug!("video pipeline dropped without teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::RawCapability;
    use crate::testing::{FakeBackend, FakeScript, Journal};

    fn request(tuning: TuningFlags, preferred: FormatPreference) -> VideoPipelineRequest {
        VideoPipelineRequest {
            device: DeviceIdentity::new("cam"),
            surface: SurfaceHandle(0x1234),
            initial_rect: DestinationRect::new(0, 0, 1280, 720),
            tuning,
            preferred_format: preferred,
        }
    }

    fn backend(script: FakeScript) -> (FakeBackend, Journal) {
        let journal = Journal::default();
        (FakeBackend::new(script, journal.clone()).unwrap(), journal)
    }

    #[test]
    fn builds_in_strict_order() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["cam"], &[]));
        let mut failures = Vec::new();
        let pipeline =
            VideoPipeline::build(&mut backend, &request(TuningFlags::LOW_LATENCY, FormatPreference::AUTO), &mut failures)
                .unwrap();

        assert_eq!(
            journal.calls(),
            vec![
                "create_graph",
                "create_graph_builder",
                "resolve_device cam",
                "add_source cam",
                "create_video_renderer",
                "enter_windowless_mode",
                "limit_input_streams 1",
                "set_clipping_surface 4660",
                "set_border_color 000000",
                "set_aspect_mode LetterBox",
                "set_output_region 0,0,1280,720",
                "add_renderer",
                "suggest_buffer_count video 2",
                "connect:preview renderer",
                "detach_reference_clock",
                "media_control",
                "run",
            ]
        );
        assert!(failures.is_empty());
        assert_eq!(pipeline.committed_format(), None);

        journal.clear();
        pipeline.teardown(&mut backend, &mut failures);
        assert_eq!(journal.calls()[0], "stop");
        assert_eq!(
            journal.released_kinds(),
            vec![
                "media control",
                "renderer control",
                "renderer",
                "source",
                "graph builder",
                "graph"
            ]
        );
        assert_eq!(journal.live_handles(), 0);
    }

    #[test]
    fn tuning_hints_skipped_when_off() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["cam"], &[]));
        let pipeline =
            VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
                .unwrap();
        let calls = journal.calls();
        for hint in ["limit_input_streams 1", "suggest_buffer_count video 2", "detach_reference_clock"] {
            assert!(!calls.iter().any(|c| c == hint), "{} should not be called", hint);
        }
        pipeline.teardown(&mut backend, &mut Vec::new());
    }

    #[test]
    fn rejected_hints_are_not_fatal() {
        let script = FakeScript::with_devices(&["cam"], &[])
            .fail("limit_input_streams")
            .fail("set_border_color")
            .fail("suggest_buffer_count")
            .fail("detach_reference_clock");
        let (mut backend, journal) = backend(script);
        let mut failures = Vec::new();
        let pipeline =
            VideoPipeline::build(&mut backend, &request(TuningFlags::LOW_LATENCY, FormatPreference::AUTO), &mut failures)
                .unwrap();

        let hints: Vec<TuningHint> = failures
            .iter()
            .filter_map(|f| match f {
                SoftFailure::TuningHintRejected { hint, .. } => Some(*hint),
                _ => None,
            })
            .collect();
        assert_eq!(
            hints,
            vec![
                TuningHint::SingleStream,
                TuningHint::BorderColor,
                TuningHint::MinimalBuffering,
                TuningHint::NoGraphClock
            ]
        );
        assert_eq!(journal.calls().last().map(String::as_str), Some("run"));
        pipeline.teardown(&mut backend, &mut failures);
    }

    #[test]
    fn falls_back_to_capture_output() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["cam"], &[]).fail("connect:preview"));
        let pipeline =
            VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
                .unwrap();
        let calls = journal.calls();
        let preview = calls.iter().position(|c| c == "connect:preview renderer").unwrap();
        assert_eq!(calls[preview + 1], "connect:capture renderer");
        pipeline.teardown(&mut backend, &mut Vec::new());
    }

    #[test]
    fn both_connections_failing_rolls_back() {
        let script = FakeScript::with_devices(&["cam"], &[])
            .fail("connect:preview")
            .fail("connect:capture");
        let (mut backend, journal) = backend(script);
        let err = VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::ConnectionFailed(_)));
        assert_eq!(
            journal.released_kinds(),
            vec!["renderer control", "renderer", "source", "graph builder", "graph"]
        );
        assert_eq!(journal.live_handles(), 0);
        assert!(!journal.calls().iter().any(|c| c == "stop"));
    }

    #[test]
    fn run_failure_stops_and_releases_everything() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["cam"], &[]).fail("run"));
        let err = VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Other(_)));
        assert!(journal.calls().iter().any(|c| c == "stop"));
        assert_eq!(journal.released_kinds()[0], "media control");
        assert_eq!(journal.live_handles(), 0);
    }

    #[test]
    fn unknown_device_releases_graph() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["other"], &[]));
        let err = VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
            .err()
            .unwrap();
        assert_eq!(err, PipelineError::device_not_found(DeviceCategory::Video, "cam"));
        assert_eq!(journal.released_kinds(), vec!["graph builder", "graph"]);
        assert_eq!(journal.live_handles(), 0);
    }

    #[test]
    fn preferred_format_is_committed_before_connecting() {
        let mut script = FakeScript::with_devices(&["cam"], &[]);
        script.capabilities.insert(
            "cam".into(),
            vec![
                RawCapability { width: 1920, height: 1080, avg_time_per_frame: 333_333 },
                RawCapability { width: 1920, height: 1080, avg_time_per_frame: 166_667 },
                RawCapability { width: 1280, height: 720, avg_time_per_frame: 166_667 },
            ],
        );
        let (mut backend, journal) = backend(script);
        let pipeline = VideoPipeline::build(
            &mut backend,
            &request(TuningFlags::NONE, FormatPreference::new(1920, 1080, 0.0)),
            &mut Vec::new(),
        )
        .unwrap();

        let committed = pipeline.committed_format().unwrap();
        assert_eq!((committed.width, committed.height), (1920, 1080));
        assert!((committed.fps - 60.0).abs() < 0.01);

        let calls = journal.calls();
        let commit = calls.iter().position(|c| c.starts_with("commit_format")).unwrap();
        let connect = calls.iter().position(|c| c.starts_with("connect:")).unwrap();
        assert!(commit < connect);
        pipeline.teardown(&mut backend, &mut Vec::new());
    }

    #[test]
    fn unmatched_or_refused_format_keeps_device_default() {
        let mut script = FakeScript::with_devices(&["cam"], &[]).fail("commit_format");
        script.capabilities.insert(
            "cam".into(),
            vec![RawCapability { width: 1280, height: 720, avg_time_per_frame: 333_333 }],
        );
        let (mut backend, journal) = backend(script);

        let mut failures = Vec::new();
        let pipeline = VideoPipeline::build(
            &mut backend,
            &request(TuningFlags::NONE, FormatPreference::new(1280, 720, 30.0)),
            &mut failures,
        )
        .unwrap();
        assert_eq!(pipeline.committed_format(), None);
        assert!(matches!(
            failures[0],
            SoftFailure::TuningHintRejected { hint: TuningHint::PreferredFormat, .. }
        ));
        pipeline.teardown(&mut backend, &mut failures);

        journal.clear();
        let pipeline = VideoPipeline::build(
            &mut backend,
            &request(TuningFlags::NONE, FormatPreference::new(3840, 2160, 0.0)),
            &mut Vec::new(),
        )
        .unwrap();
        assert!(!journal.calls().iter().any(|c| c.starts_with("commit_format")));
        pipeline.teardown(&mut backend, &mut Vec::new());
    }

    #[test]
    fn release_failures_do_not_stop_teardown() {
        let (mut backend, journal) = backend(FakeScript::with_devices(&["cam"], &[]).fail_release("renderer"));
        let pipeline =
            VideoPipeline::build(&mut backend, &request(TuningFlags::NONE, FormatPreference::AUTO), &mut Vec::new())
                .unwrap();
        let mut failures = Vec::new();
        pipeline.teardown(&mut backend, &mut failures);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            SoftFailure::ResourceReleaseFailed { handle: "video renderer", .. }
        ));
        assert_eq!(journal.live_handles(), 0);
        assert_eq!(journal.released_kinds().last(), Some(&"graph"));
    }
}
