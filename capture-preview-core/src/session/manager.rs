use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::models::device::DeviceIdentity;
use crate::models::error::{NativeResult, PipelineError};
use crate::models::format::VideoFormat;
use crate::models::geometry::DestinationRect;
use crate::models::state::{ActiveSession, SessionState};
use crate::models::stats::{FrameStatsSample, NativeVideoSize};
use crate::traits::media_backend::MediaBackend;
use crate::traits::session_delegate::SessionDelegate;

use super::pending::Pending;
use super::request::StartRequest;
use super::worker::{Command, PipelineWorker, SharedState};

type Launcher = Box<dyn FnOnce() -> Option<(mpsc::Sender<Command>, JoinHandle<()>)> + Send>;

enum WorkerSlot {
    /// Worker not spawned yet; spawned by the first command.
    NotStarted(Launcher),
    Running {
        sender: mpsc::Sender<Command>,
        thread: JoinHandle<()>,
    },
    /// Backend initialization failed, or the manager was shut down.
    Unavailable,
}

/// Owns the capture session: one video preview pipeline and one audio monitor
/// pipeline, built and torn down on a dedicated worker thread.
///
/// Every operation is queued on the worker and runs to completion before the
/// next one starts. Native handles never leave the worker thread.
///
/// # Example
///
/// ```ignore
/// let manager = SessionManager::new(|| DirectShowBackend::new());
/// manager
///     .start(StartRequest::new(video_path, audio_path, surface, rect))
///     .wait()?;
/// // ...
/// manager.stop().wait();
/// ```
pub struct SessionManager {
    worker: Mutex<WorkerSlot>,
    shared: Arc<Mutex<SharedState>>,
}

fn worker_unavailable() -> Result<(), PipelineError> {
    Err(PipelineError::Other("pipeline worker unavailable".into()))
}

fn no_stats() -> FrameStatsSample {
    FrameStatsSample::zero(Instant::now())
}

impl SessionManager {
    /// Create a manager whose backend is built by `factory` on the worker
    /// thread, the first time a command is submitted.
    pub fn new<B, F>(factory: F) -> Self
    where
        B: MediaBackend + 'static,
        F: FnOnce() -> NativeResult<B> + Send + 'static,
    {
        Self::build(factory, None)
    }

    pub fn with_delegate<B, F>(factory: F, delegate: Arc<dyn SessionDelegate>) -> Self
    where
        B: MediaBackend + 'static,
        F: FnOnce() -> NativeResult<B> + Send + 'static,
    {
        Self::build(factory, Some(delegate))
    }

    fn build<B, F>(factory: F, delegate: Option<Arc<dyn SessionDelegate>>) -> Self
    where
        B: MediaBackend + 'static,
        F: FnOnce() -> NativeResult<B> + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let worker_shared = Arc::clone(&shared);
        let launcher: Launcher = Box::new(move || launch(factory, worker_shared, delegate));
        Self {
            worker: Mutex::new(WorkerSlot::NotStarted(launcher)),
            shared,
        }
    }

    /// Build and start both pipelines. Anything already running is stopped first.
    ///
    /// On failure everything built so far has been released and the session
    /// is idle again.
    pub fn start(&self, request: StartRequest) -> Pending<Result<(), PipelineError>> {
        self.submit(|reply| Command::Start { request, reply }, worker_unavailable)
    }

    /// Stop and release both pipelines. Never fails; a no-op when idle.
    pub fn stop(&self) -> Pending<()> {
        self.submit(|reply| Command::Stop { reply }, || ())
    }

    /// Apply a new request to a running session: stop, then start with it.
    ///
    /// Resolves to `Ok(())` without touching any device when nothing is
    /// running, so settings changed while idle only take effect on the next
    /// `start`.
    pub fn restart(&self, request: StartRequest) -> Pending<Result<(), PipelineError>> {
        self.submit(|reply| Command::Restart { request, reply }, worker_unavailable)
    }

    /// Move the preview within the output surface. A no-op while idle.
    pub fn update_output_region(&self, rect: DestinationRect) -> Pending<()> {
        self.submit(|reply| Command::UpdateOutputRegion { rect, reply }, || ())
    }

    /// Cumulative renderer counters, stamped when sampled. Zeros when idle.
    pub fn frame_stats(&self) -> Pending<FrameStatsSample> {
        self.submit(|reply| Command::FrameStats { reply }, no_stats)
    }

    pub fn native_video_size(&self) -> Pending<NativeVideoSize> {
        self.submit(|reply| Command::NativeVideoSize { reply }, NativeVideoSize::default)
    }

    /// Frame rate of the format the video source committed to; zero when unknown.
    pub fn nominal_fps(&self) -> Pending<f64> {
        self.submit(|reply| Command::NominalFps { reply }, || 0.0)
    }

    /// Supported formats of a video device, best first. Empty on any failure.
    ///
    /// Blocks until the worker gets to it, also when called from inside an
    /// async runtime; async code can await
    /// [`list_formats_async`](Self::list_formats_async) instead.
    pub fn list_formats(&self, device: impl Into<DeviceIdentity>) -> Vec<VideoFormat> {
        self.list_formats_async(device).wait()
    }

    pub fn list_formats_async(&self, device: impl Into<DeviceIdentity>) -> Pending<Vec<VideoFormat>> {
        let device = device.into();
        self.submit(|reply| Command::ListFormats { device, reply }, Vec::new)
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn active_session(&self) -> Option<ActiveSession> {
        self.shared.lock().active.clone()
    }

    /// Stop the session and join the worker. Later commands resolve to their
    /// fallback values. Called on drop.
    pub fn shutdown(&self) {
        let slot = std::mem::replace(&mut *self.worker.lock(), WorkerSlot::Unavailable);
        if let WorkerSlot::Running { sender, thread } = slot {
            // The worker stops the session on its way out.
            let _ = sender.send(Command::Shutdown);
            if thread.join().is_err() {
                log::error!("pipeline worker panicked");
            }
        }
    }

    fn submit<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command, fallback: fn() -> T) -> Pending<T> {
        // Queue while holding the slot so submission order is queue order.
        let mut slot = self.worker.lock();
        let Some(sender) = ensure_running(&mut slot) else {
            return Pending::disconnected(fallback);
        };
        let (reply, rx) = oneshot::channel();
        // A failed send drops the reply sender; the caller then gets the fallback.
        let _ = sender.send(command(reply));
        Pending::new(rx, fallback)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ensure_running(slot: &mut WorkerSlot) -> Option<&mpsc::Sender<Command>> {
    if matches!(slot, WorkerSlot::NotStarted(_)) {
        *slot = match std::mem::replace(slot, WorkerSlot::Unavailable) {
            WorkerSlot::NotStarted(launcher) => match launcher() {
                Some((sender, thread)) => WorkerSlot::Running { sender, thread },
                None => WorkerSlot::Unavailable,
            },
            other => other,
        };
    }
    match slot {
        WorkerSlot::Running { sender, .. } => Some(sender),
        _ => None,
    }
}

/// Spawn the worker and wait until its backend is initialized.
fn launch<B, F>(
    factory: F,
    shared: Arc<Mutex<SharedState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
) -> Option<(mpsc::Sender<Command>, JoinHandle<()>)>
where
    B: MediaBackend + 'static,
    F: FnOnce() -> NativeResult<B> + Send + 'static,
{
    let (sender, commands) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    let spawned = thread::Builder::new()
        .name("pipeline-worker".into())
        .spawn(move || {
            let backend = match factory() {
                Ok(backend) => backend,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            PipelineWorker::new(backend, shared, delegate).run(commands);
        });
    let thread = match spawned {
        Ok(thread) => thread,
        Err(e) => {
            log::error!("failed to spawn pipeline worker: {}", e);
            return None;
        }
    };

    match ready_rx.recv() {
        Ok(Ok(())) => Some((sender, thread)),
        Ok(Err(e)) => {
            log::error!("media backend initialization failed: {}", e);
            let _ = thread.join();
            None
        }
        Err(_) => {
            log::error!("pipeline worker exited during initialization");
            let _ = thread.join();
            None
        }
    }
}
