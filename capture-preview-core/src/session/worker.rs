use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::catalog::format_catalog;
use crate::models::device::DeviceIdentity;
use crate::models::error::{PipelineError, SoftFailure};
use crate::models::format::VideoFormat;
use crate::models::geometry::DestinationRect;
use crate::models::state::{ActiveSession, SessionState};
use crate::models::stats::{FrameStatsSample, NativeVideoSize};
use crate::pipeline::{AudioPipeline, VideoPipeline};
use crate::stats::sampler;
use crate::traits::media_backend::MediaBackend;
use crate::traits::session_delegate::SessionDelegate;

use super::request::StartRequest;

/// Commands the manager queues for the worker, executed one at a time in
/// submission order.
pub(crate) enum Command {
    Start {
        request: StartRequest,
        reply: oneshot::Sender<Result<(), PipelineError>>,
    },
    /// Start again with a new request, only if a session is running.
    Restart {
        request: StartRequest,
        reply: oneshot::Sender<Result<(), PipelineError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    UpdateOutputRegion {
        rect: DestinationRect,
        reply: oneshot::Sender<()>,
    },
    FrameStats {
        reply: oneshot::Sender<FrameStatsSample>,
    },
    NativeVideoSize {
        reply: oneshot::Sender<NativeVideoSize>,
    },
    NominalFps {
        reply: oneshot::Sender<f64>,
    },
    ListFormats {
        device: DeviceIdentity,
        reply: oneshot::Sender<Vec<VideoFormat>>,
    },
    /// Stop whatever runs and leave the loop.
    Shutdown,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Restart { .. } => "restart",
            Self::Stop { .. } => "stop",
            Self::UpdateOutputRegion { .. } => "update output region",
            Self::FrameStats { .. } => "frame stats",
            Self::NativeVideoSize { .. } => "native video size",
            Self::NominalFps { .. } => "nominal fps",
            Self::ListFormats { .. } => "list formats",
            Self::Shutdown => "shutdown",
        }
    }
}

/// State readable from any thread.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub state: SessionState,
    pub active: Option<ActiveSession>,
}

/// Owns the backend and both pipelines. Lives on the worker thread only.
///
/// Pipelines are declared before the backend so they drop first.
pub(crate) struct PipelineWorker<B: MediaBackend> {
    video: Option<VideoPipeline<B>>,
    audio: Option<AudioPipeline<B>>,
    backend: B,
    shared: Arc<Mutex<SharedState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: MediaBackend> PipelineWorker<B> {
    pub fn new(backend: B, shared: Arc<Mutex<SharedState>>, delegate: Option<Arc<dyn SessionDelegate>>) -> Self {
        Self {
            video: None,
            audio: None,
            backend,
            shared,
            delegate,
        }
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    pub fn run(mut self, commands: mpsc::Receiver<Command>) {
        log::info!("pipeline worker running");
        while let Ok(command) = commands.recv() {
            log::debug!("pipeline worker: {}", command.name());
            if !self.dispatch(command) {
                break;
            }
        }
        self.stop_internal();
        log::info!("pipeline worker exiting");
    }

    fn dispatch(&mut self, command: Command) -> bool {
        // A caller that stopped waiting drops its receiver; the reply is discarded.
        match command {
            Command::Start { request, reply } => {
                let _ = reply.send(self.start_internal(request));
            }
            Command::Restart { request, reply } => {
                let result = if self.video.is_none() && self.audio.is_none() {
                    log::debug!("restart requested while idle, nothing to do");
                    Ok(())
                } else {
                    self.start_internal(request)
                };
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                self.stop_internal();
                let _ = reply.send(());
            }
            Command::UpdateOutputRegion { rect, reply } => {
                self.update_output_region(rect);
                let _ = reply.send(());
            }
            Command::FrameStats { reply } => {
                let mut failures = Vec::new();
                let counters = sampler::sample_frame_counters(&mut self.backend, self.video.as_ref(), &mut failures);
                self.report(&failures);
                let _ = reply.send(FrameStatsSample::new(counters, Instant::now()));
            }
            Command::NativeVideoSize { reply } => {
                let mut failures = Vec::new();
                let size = sampler::native_video_size(&mut self.backend, self.video.as_ref(), &mut failures);
                self.report(&failures);
                let _ = reply.send(size);
            }
            Command::NominalFps { reply } => {
                let mut failures = Vec::new();
                let fps = sampler::nominal_fps(&mut self.backend, self.video.as_ref(), &mut failures);
                self.report(&failures);
                let _ = reply.send(fps);
            }
            Command::ListFormats { device, reply } => {
                let _ = reply.send(format_catalog::list_formats(&mut self.backend, &device));
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn start_internal(&mut self, request: StartRequest) -> Result<(), PipelineError> {
        self.stop_internal();
        self.set_state(SessionState::Starting, None);

        let mut failures = Vec::new();
        let result = self.build(&request, &mut failures);
        self.report(&failures);

        match result {
            Ok(()) => {
                let session = ActiveSession {
                    id: Uuid::new_v4(),
                    started_at: Utc::now(),
                    video_device: request.video_device.clone(),
                    audio_device: request.audio_device.clone(),
                    committed_format: self.video.as_ref().and_then(VideoPipeline::committed_format),
                };
                log::info!(
                    "session {} running: video={} audio={}",
                    session.id,
                    session.video_device,
                    session.audio_device
                );
                self.set_state(SessionState::Running, Some(session));
                Ok(())
            }
            Err(err) => {
                log::warn!("session start failed: {}", err);
                self.set_state(SessionState::Idle, None);
                if let Some(delegate) = &self.delegate {
                    delegate.on_start_failed(&err);
                }
                Err(err)
            }
        }
    }

    /// Video first, then audio. An audio failure takes the video pipeline down too.
    fn build(&mut self, request: &StartRequest, failures: &mut Vec<SoftFailure>) -> Result<(), PipelineError> {
        let video = VideoPipeline::build(&mut self.backend, &request.video(), failures)?;
        let audio = match AudioPipeline::build(&mut self.backend, &request.audio_device, &request.tuning, failures) {
            Ok(audio) => audio,
            Err(err) => {
                video.teardown(&mut self.backend, failures);
                return Err(err);
            }
        };
        self.video = Some(video);
        self.audio = Some(audio);
        Ok(())
    }

    fn stop_internal(&mut self) {
        if self.video.is_none() && self.audio.is_none() && self.shared.lock().state.is_idle() {
            return;
        }
        self.set_state(SessionState::Stopping, None);

        let video = self.video.take();
        let audio = self.audio.take();

        // Halt both graphs before releasing either.
        if let Some(video) = &video {
            video.halt(&mut self.backend);
        }
        if let Some(audio) = &audio {
            audio.halt(&mut self.backend);
        }

        let mut failures = Vec::new();
        if let Some(video) = video {
            video.release(&mut failures);
        }
        if let Some(audio) = audio {
            audio.release(&mut failures);
        }
        self.report(&failures);

        self.set_state(SessionState::Idle, None);
        log::info!("session stopped");
    }

    /// Ignored while idle; the next start takes its region from the request.
    fn update_output_region(&mut self, rect: DestinationRect) {
        let Some(video) = &self.video else {
            return;
        };
        if let Err(failure) = video.set_output_region(&mut self.backend, &rect) {
            failure.log();
            self.report(std::slice::from_ref(&failure));
        }
    }

    fn set_state(&self, state: SessionState, active: Option<ActiveSession>) {
        {
            let mut shared = self.shared.lock();
            if shared.state == state {
                return;
            }
            shared.state = state;
            shared.active = active;
        }
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn report(&self, failures: &[SoftFailure]) {
        if let Some(delegate) = &self.delegate {
            for failure in failures {
                delegate.on_soft_failure(failure);
            }
        }
    }
}
