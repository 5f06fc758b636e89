use crate::models::device::{DeviceCategory, DeviceIdentity};
use crate::models::error::{PipelineError, SoftFailure, TuningHint};
use crate::models::tuning::TuningFlags;
use crate::traits::media_backend::{MediaBackend, MediaKind, StreamCategory};

use super::best_effort;
use super::owned::{release_slot, Owned};
use super::video::resolve;

/// Audio monitor pipeline: capture source → default audio renderer.
///
/// Slots are declared in reverse acquisition order.
pub struct AudioPipeline<B: MediaBackend> {
    media_control: Option<Owned<B::MediaControl>>,
    source: Option<Owned<B::Source>>,
    graph_builder: Option<Owned<B::GraphBuilder>>,
    graph: Option<Owned<B::Graph>>,
}

impl<B: MediaBackend> AudioPipeline<B> {
    /// Build and start the monitor pipeline, rolling back on failure.
    pub fn build(
        backend: &mut B,
        device: &DeviceIdentity,
        tuning: &TuningFlags,
        failures: &mut Vec<SoftFailure>,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self {
            media_control: None,
            source: None,
            graph_builder: None,
            graph: None,
        };
        match pipeline.construct(backend, device, tuning, failures) {
            Ok(()) => Ok(pipeline),
            Err(err) => {
                log::warn!("audio pipeline build failed, rolling back: {}", err);
                pipeline.teardown(backend, failures);
                Err(err)
            }
        }
    }

    fn construct(
        &mut self,
        backend: &mut B,
        device: &DeviceIdentity,
        tuning: &TuningFlags,
        failures: &mut Vec<SoftFailure>,
    ) -> Result<(), PipelineError> {
        let graph = self.graph.insert(Owned::new("audio graph", backend.create_graph()?));
        let builder = self
            .graph_builder
            .insert(Owned::new("audio graph builder", backend.create_graph_builder(graph.get())?));

        let resolved = resolve(backend, DeviceCategory::Audio, device)?;
        let source = self
            .source
            .insert(Owned::new("audio source", backend.add_source(graph.get(), &resolved)?));

        if tuning.minimal_buffering {
            best_effort(
                TuningHint::MinimalBuffering,
                backend.suggest_buffer_count(
                    builder.get(),
                    source.get(),
                    MediaKind::Audio,
                    TuningFlags::MINIMAL_BUFFER_COUNT,
                ),
                failures,
            );
        }

        backend
            .connect(
                builder.get(),
                source.get(),
                StreamCategory::Capture,
                MediaKind::Audio,
                None,
            )
            .map_err(|e| PipelineError::ConnectionFailed(format!("audio source to default sink: {}", e)))?;

        let control = self
            .media_control
            .insert(Owned::new("audio media control", backend.media_control(graph.get())?));
        backend.run(control.get())?;

        log::info!("audio monitor running: device={}", device);
        Ok(())
    }

    /// Stop media flow and release every handle in reverse acquisition order.
    pub fn teardown(self, backend: &mut B, failures: &mut Vec<SoftFailure>) {
        self.halt(backend);
        self.release(failures);
    }

    pub fn halt(&self, backend: &mut B) {
        if let Some(control) = &self.media_control {
            if let Err(e) = backend.stop(control.get()) {
                log::debug!("audio graph stop failed: {}", e);
            }
        }
    }

    pub fn release(mut self, failures: &mut Vec<SoftFailure>) {
        release_slot(&mut self.media_control, failures);
        release_slot(&mut self.source, failures);
        release_slot(&mut self.graph_builder, failures);
        release_slot(&mut self.graph, failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeScript, Journal};

    #[test]
    fn builds_monitor_into_default_sink() {
        let journal = Journal::default();
        let mut backend = FakeBackend::new(FakeScript::with_devices(&[], &["mic"]), journal.clone()).unwrap();
        let pipeline =
            AudioPipeline::build(&mut backend, &DeviceIdentity::new("MIC"), &TuningFlags::LOW_LATENCY, &mut Vec::new())
                .unwrap();
        assert_eq!(
            journal.calls(),
            vec![
                "create_graph",
                "create_graph_builder",
                "resolve_device MIC",
                "add_source mic",
                "suggest_buffer_count audio 2",
                "connect:audio default sink",
                "media_control",
                "run",
            ]
        );

        journal.clear();
        pipeline.teardown(&mut backend, &mut Vec::new());
        assert_eq!(journal.calls()[0], "stop");
        assert_eq!(
            journal.released_kinds(),
            vec!["media control", "source", "graph builder", "graph"]
        );
    }

    #[test]
    fn connection_failure_rolls_back() {
        let journal = Journal::default();
        let script = FakeScript::with_devices(&[], &["mic"]).fail("connect:audio");
        let mut backend = FakeBackend::new(script, journal.clone()).unwrap();
        let err = AudioPipeline::build(&mut backend, &DeviceIdentity::new("mic"), &TuningFlags::NONE, &mut Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::ConnectionFailed(_)));
        assert_eq!(journal.live_handles(), 0);
    }

    #[test]
    fn unknown_device_is_reported() {
        let journal = Journal::default();
        let mut backend = FakeBackend::new(FakeScript::default(), journal.clone()).unwrap();
        let err = AudioPipeline::build(&mut backend, &DeviceIdentity::new("mic"), &TuningFlags::NONE, &mut Vec::new())
            .err()
            .unwrap();
        assert_eq!(err, PipelineError::device_not_found(DeviceCategory::Audio, "mic"));
        assert_eq!(journal.live_handles(), 0);
    }
}
