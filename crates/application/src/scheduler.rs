//! Render Scheduler: debounced, single-slot background rendering.
//!
//! Requests go to one worker thread. Each request bumps a generation counter;
//! a render whose generation is no longer current when it is about to start,
//! or about to deliver, resolves as [`RenderOutcome::Cancelled`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};
use memoir_core::Manuscript;
use memoir_engine::{Engine, RenderedOutput};

/// Anything that can turn a manuscript into a finished output.
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, manuscript: &Manuscript) -> anyhow::Result<RenderedOutput>;
}

impl Renderer for Engine {
    fn render(&self, manuscript: &Manuscript) -> anyhow::Result<RenderedOutput> {
        Engine::render(self, manuscript)
    }
}

/// Lifecycle notifications. `render_finished` follows every `render_started`,
/// whatever the outcome.
pub trait RenderObserver: Send + Sync {
    fn render_started(&self) {}
    fn render_finished(&self) {}
}

#[derive(Debug)]
pub enum RenderOutcome {
    Completed(RenderedOutput),
    Failed(anyhow::Error),
    Cancelled,
}

impl RenderOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Idle,
    Pending,
    Rendering,
}

/// Receives the outcome of one request.
#[derive(Debug)]
pub struct RenderHandle {
    generation: u64,
    receiver: Receiver<RenderOutcome>,
}

impl RenderHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Blocks until the request resolves.
    pub fn wait(self) -> RenderOutcome {
        self.receiver.recv().unwrap_or_else(|_| worker_gone())
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<RenderOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(worker_gone()),
        }
    }

    pub fn try_outcome(&self) -> Option<RenderOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(worker_gone()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn worker_gone() -> RenderOutcome {
    RenderOutcome::Failed(anyhow::anyhow!("render worker stopped"))
}

type Deliver = Box<dyn FnOnce(RenderOutcome) + Send>;

struct Job {
    generation: u64,
    manuscript: Arc<Manuscript>,
    deliver: Deliver,
}

impl Job {
    fn cancel(self) {
        (self.deliver)(RenderOutcome::Cancelled);
    }
}

enum Command {
    Render(Job),
    Cancel,
    Shutdown,
}

struct Shared {
    generation: AtomicU64,
    /// Status changes happen under this lock together with generation checks.
    status: Mutex<RenderStatus>,
}

impl Shared {
    fn status(&self) -> MutexGuard<'_, RenderStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

pub struct RenderScheduler {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl RenderScheduler {
    pub fn new(renderer: Arc<dyn Renderer>, debounce: Duration) -> Self {
        Self::spawn(renderer, debounce, None)
    }

    pub fn with_observer(
        renderer: Arc<dyn Renderer>,
        debounce: Duration,
        observer: Arc<dyn RenderObserver>,
    ) -> Self {
        Self::spawn(renderer, debounce, Some(observer))
    }

    fn spawn(
        renderer: Arc<dyn Renderer>,
        debounce: Duration,
        observer: Option<Arc<dyn RenderObserver>>,
    ) -> Self {
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            status: Mutex::new(RenderStatus::Idle),
        });
        let (commands, receiver) = mpsc::channel();
        let worker = Worker {
            shared: Arc::clone(&shared),
            renderer,
            observer,
            debounce,
        };
        let worker = std::thread::Builder::new()
            .name("memoir-render".to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|err| warn!("failed to spawn render worker: {err}"))
            .ok();

        Self {
            shared,
            commands,
            worker,
        }
    }

    /// Supersedes any pending or running request and arms a new debounce window.
    pub fn request_render(&self, manuscript: Arc<Manuscript>) -> RenderHandle {
        let (sender, receiver) = mpsc::channel();
        let generation = self.submit(
            manuscript,
            Box::new(move |outcome| {
                let _ = sender.send(outcome);
            }),
        );
        RenderHandle {
            generation,
            receiver,
        }
    }

    /// Continuation form: neither callback runs if the request is cancelled.
    pub fn request_render_with<C, E>(&self, manuscript: Arc<Manuscript>, on_complete: C, on_error: E)
    where
        C: FnOnce(RenderedOutput) + Send + 'static,
        E: FnOnce(anyhow::Error) + Send + 'static,
    {
        self.submit(
            manuscript,
            Box::new(move |outcome| match outcome {
                RenderOutcome::Completed(output) => on_complete(output),
                RenderOutcome::Failed(err) => on_error(err),
                RenderOutcome::Cancelled => {}
            }),
        );
    }

    /// Cancels the pending request and abandons a running one.
    pub fn cancel_pending(&self) {
        {
            let mut status = self.shared.status();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *status = RenderStatus::Idle;
        }
        let _ = self.commands.send(Command::Cancel);
    }

    pub fn status(&self) -> RenderStatus {
        *self.shared.status()
    }

    fn submit(&self, manuscript: Arc<Manuscript>, deliver: Deliver) -> u64 {
        let generation = {
            let mut status = self.shared.status();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = RenderStatus::Pending;
            generation
        };
        let job = Job {
            generation,
            manuscript,
            deliver,
        };
        if let Err(mpsc::SendError(command)) = self.commands.send(Command::Render(job)) {
            *self.shared.status() = RenderStatus::Idle;
            if let Command::Render(job) = command {
                (job.deliver)(worker_gone());
            }
        }
        generation
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("render worker panicked");
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    renderer: Arc<dyn Renderer>,
    observer: Option<Arc<dyn RenderObserver>>,
    debounce: Duration,
}

impl Worker {
    fn run(self, commands: Receiver<Command>) {
        let mut pending: Option<(Job, Instant)> = None;

        loop {
            let command = match &pending {
                Some((_, deadline)) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match commands.recv_timeout(wait) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            if let Some((job, _)) = pending.take() {
                                self.execute(job);
                            }
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            match command {
                Command::Render(job) => {
                    if let Some((superseded, _)) = pending.take() {
                        debug!("render request {} superseded", superseded.generation);
                        superseded.cancel();
                    }
                    pending = Some((job, Instant::now() + self.debounce));
                }
                Command::Cancel => {
                    if let Some((cancelled, _)) = pending.take() {
                        cancelled.cancel();
                    }
                }
                Command::Shutdown => break,
            }
        }

        if let Some((job, _)) = pending.take() {
            job.cancel();
        }
    }

    fn execute(&self, job: Job) {
        {
            let mut status = self.shared.status();
            if !self.shared.is_current(job.generation) {
                drop(status);
                job.cancel();
                return;
            }
            *status = RenderStatus::Rendering;
        }

        if let Some(observer) = &self.observer {
            observer.render_started();
        }
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| self.renderer.render(&job.manuscript)))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!("renderer panicked: {}", panic_message(&*payload)))
                });
        if let Some(observer) = &self.observer {
            observer.render_finished();
        }

        let current = {
            let mut status = self.shared.status();
            let current = self.shared.is_current(job.generation);
            if current {
                *status = RenderStatus::Idle;
            }
            current
        };

        let outcome = match result {
            _ if !current => {
                debug!("render {} finished after cancellation, discarded", job.generation);
                RenderOutcome::Cancelled
            }
            Ok(output) => RenderOutcome::Completed(output),
            Err(err) => RenderOutcome::Failed(err),
        };
        (job.deliver)(outcome);
    }
}
