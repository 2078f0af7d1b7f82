//! Explicitly owned engine context.
//!
//! The engine owns the gradient, mask, emitter arrangement and colour policy,
//! plus a background worker that renders frames. Each render request gets a
//! generation number; the worker skips queued requests that already have a
//! newer successor, abandons a running render once it is superseded, and
//! `poll_events` never hands out a frame older than one already delivered.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::RenderError;
use crate::field::EmitterArrangement;
use crate::gradient::{ColourGradient, GradientLut};
use crate::mask::MaskConfig;
use crate::render::{ColourPolicy, RenderInput, render, render_with_cancel};
use crate::types::{PixelBuffer, Rgb};

#[derive(Debug)]
pub enum EngineEvent {
    /// The gradient table was rebuilt after an edit batch.
    GradientUpdated { revision: u64 },
    RenderReady { generation: u64, frame: PixelBuffer },
    /// The request was degenerate; show a "nothing to render" state.
    NothingToRender { generation: u64, reason: RenderError },
}

impl EngineEvent {
    pub fn generation(&self) -> Option<u64> {
        match self {
            EngineEvent::GradientUpdated { .. } => None,
            EngineEvent::RenderReady { generation, .. }
            | EngineEvent::NothingToRender { generation, .. } => Some(*generation),
        }
    }
}

/// Highest-generation-wins gate for render results.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameSlot {
    delivered: u64,
}

impl FrameSlot {
    /// Accept `generation` if it is newer than everything accepted so far.
    pub fn accept(&mut self, generation: u64) -> bool {
        if generation <= self.delivered {
            return false;
        }
        self.delivered = generation;
        true
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Snapshot of everything one background render needs.
struct RenderJob {
    generation: u64,
    width: usize,
    height: usize,
    arrangement: EmitterArrangement,
    policy: ColourPolicy,
    gradient: Arc<GradientLut>,
    mask: MaskConfig,
}

pub struct Engine {
    gradient: ColourGradient,
    mask: MaskConfig,
    arrangement: EmitterArrangement,
    policy: ColourPolicy,
    latest_generation: Arc<AtomicU64>,
    jobs: Option<Sender<RenderJob>>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    frames: FrameSlot,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new(
        gradient: ColourGradient,
        mask: MaskConfig,
        arrangement: EmitterArrangement,
        policy: ColourPolicy,
    ) -> Self {
        let latest_generation = Arc::new(AtomicU64::new(0));
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();

        let worker = {
            let events = events_tx.clone();
            let latest = Arc::clone(&latest_generation);
            thread::Builder::new()
                .name("render-worker".into())
                .spawn(move || run_worker(jobs_rx, events, latest))
                .map_err(|e| warn!("failed to spawn render worker: {e}"))
                .ok()
        };

        Self {
            gradient,
            mask: mask.sanitized(),
            arrangement,
            policy,
            latest_generation,
            jobs: worker.as_ref().map(|_| jobs_tx),
            events_tx,
            events_rx,
            frames: FrameSlot::default(),
            worker,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.gradient(), settings.mask(), settings.arrangement(), settings.colour)
    }

    /* ---------- gradient ---------- */

    pub fn gradient(&self) -> &ColourGradient {
        &self.gradient
    }

    /// Run a batch of gradient edits. However many mutations `edit` makes,
    /// the table is rebuilt once and one `GradientUpdated` event is queued;
    /// a batch that changed nothing queues nothing.
    pub fn edit_gradient<R>(&mut self, edit: impl FnOnce(&mut ColourGradient) -> R) -> R {
        let out = edit(&mut self.gradient);
        if self.gradient.flush() {
            let revision = self.gradient.revision();
            let _ = self.events_tx.send(EngineEvent::GradientUpdated { revision });
        }
        out
    }

    pub fn colour_at(&mut self, location: f64) -> Rgb {
        self.gradient.colour_at(location)
    }

    pub fn gradient_lut(&mut self) -> Arc<GradientLut> {
        self.gradient.lut()
    }

    /* ---------- mask ---------- */

    pub fn mask(&self) -> &MaskConfig {
        &self.mask
    }

    pub fn set_mask(&mut self, mask: MaskConfig) {
        self.mask = mask.sanitized();
    }

    /* ---------- emitters ---------- */

    pub fn arrangement(&self) -> &EmitterArrangement {
        &self.arrangement
    }

    pub fn set_arrangement(&mut self, arrangement: EmitterArrangement) {
        self.arrangement = arrangement;
    }

    /// Single-field edits go through the arrangement's own clamping setters.
    pub fn update_arrangement<R>(&mut self, edit: impl FnOnce(&mut EmitterArrangement) -> R) -> R {
        edit(&mut self.arrangement)
    }

    /* ---------- colour policy ---------- */

    pub fn policy(&self) -> &ColourPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: ColourPolicy) {
        self.policy = policy;
    }

    /* ---------- rendering ---------- */

    /// Newest generation handed out by `request_render`.
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::Acquire)
    }

    /// Queue a background render of the current state. The result arrives as
    /// a `RenderReady` or `NothingToRender` event tagged with the returned
    /// generation. Without a worker the frame is rendered inline.
    pub fn request_render(&mut self, width: usize, height: usize) -> u64 {
        let generation = self.latest_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let job = RenderJob {
            generation,
            width,
            height,
            arrangement: self.arrangement.clone(),
            policy: self.policy,
            gradient: self.gradient.lut(),
            mask: self.mask,
        };

        let job = match &self.jobs {
            Some(jobs) => match jobs.send(job) {
                Ok(()) => return generation,
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };
        let _ = self.events_tx.send(execute(&job, || false));
        generation
    }

    /// Render the current state on the calling thread.
    pub fn render_now(&mut self, width: usize, height: usize) -> Result<PixelBuffer, RenderError> {
        let gradient = self.gradient.lut();
        render(&RenderInput {
            width,
            height,
            arrangement: &self.arrangement,
            policy: &self.policy,
            gradient: &gradient,
            mask: &self.mask,
        })
    }

    /// Drain pending events. Render events that are not newer than the last
    /// delivered one are dropped.
    pub fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if self.admit(&event) {
                out.push(event);
            }
        }
        out
    }

    /// Block for up to `timeout` for the next admissible event.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<EngineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(left) {
                Ok(event) if self.admit(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn admit(&mut self, event: &EngineEvent) -> bool {
        match event.generation() {
            Some(generation) => {
                let fresh = self.frames.accept(generation);
                if !fresh {
                    debug!(generation, delivered = self.frames.delivered(), "dropping stale render");
                }
                fresh
            }
            None => true,
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}

fn execute(job: &RenderJob, cancelled: impl Fn() -> bool + Sync) -> EngineEvent {
    let generation = job.generation;
    let started = Instant::now();
    let input = RenderInput {
        width: job.width,
        height: job.height,
        arrangement: &job.arrangement,
        policy: &job.policy,
        gradient: &job.gradient,
        mask: &job.mask,
    };
    match render_with_cancel(&input, cancelled) {
        Ok(frame) => {
            debug!(
                generation,
                width = job.width,
                height = job.height,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "render finished"
            );
            EngineEvent::RenderReady { generation, frame }
        }
        Err(RenderError::Cancelled { .. }) => EngineEvent::NothingToRender {
            generation,
            reason: RenderError::Cancelled { generation },
        },
        Err(reason) => {
            debug!(generation, %reason, "nothing to render");
            EngineEvent::NothingToRender { generation, reason }
        }
    }
}

fn run_worker(jobs: Receiver<RenderJob>, events: Sender<EngineEvent>, latest: Arc<AtomicU64>) {
    while let Ok(mut job) = jobs.recv() {
        // Only the newest queued request is worth rendering.
        while let Ok(newer) = jobs.try_recv() {
            job = newer;
        }
        let generation = job.generation;
        let event = execute(&job, || latest.load(Ordering::Acquire) > generation);
        if let EngineEvent::NothingToRender { reason: RenderError::Cancelled { .. }, .. } = event {
            debug!(generation, "render superseded");
            continue;
        }
        if events.send(event).is_err() {
            warn!("engine event channel closed; render worker stopping");
            break;
        }
    }
}
