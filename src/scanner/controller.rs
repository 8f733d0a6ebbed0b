// SPDX-License-Identifier: GPL-3.0-only

//! Scan controller
//!
//! Owns at most one scan session at a time and drives it through
//! `Idle -> Acquiring -> Active -> Stopping -> Idle`:
//!
//! ```text
//! start_scanner ──► Acquiring ──ok──► Active ──tick──► sample ─► decode
//!                      │                 │                          │
//!                     err            stop_scanner        found / error
//!                      ▼                 ▼                          ▼
//!                    Idle ◄────────── Stopping ◄────── single-shot or fatal
//! ```
//!
//! All session state sits behind one mutex. Every session gets a fresh
//! generation number; timer ticks and acquisition results carry the
//! generation they were started for and do nothing once it is stale, so
//! after `stop_scanner` returns no further tick can decode or call back.
//! Callbacks are invoked after the lock is released.

use super::acquisition::CameraAcquisition;
use super::sampler::FrameSampler;
use super::surface::VideoSurface;
use super::tasks::{BarcodeDecoder, SymbolDecoder};
use super::types::{DecodeOutcome, ScanHit, ScanMode, ScanState, ScannerStatus};
use crate::backends::camera::{CameraBackend, MediaStream};
use crate::config::Config;
use crate::constants::scanner as scanner_consts;
use crate::errors::ScanError;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type SuccessFn = Box<dyn Fn(&ScanHit) + Send + Sync>;
type FailureFn = Box<dyn Fn(&ScanError) + Send + Sync>;

/// Success and failure handlers
///
/// The controller holds one set at a time; [`ScanController::set_callbacks`]
/// swaps the whole set at once.
#[derive(Default)]
pub struct ScanCallbacks {
    on_success: Option<SuccessFn>,
    on_failure: Option<FailureFn>,
}

impl ScanCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with every decoded symbol
    pub fn on_scan_success(mut self, f: impl Fn(&ScanHit) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called once when a session ends because of an error
    pub fn on_scan_failure(mut self, f: impl Fn(&ScanError) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    fn success(&self, hit: &ScanHit) {
        if let Some(f) = &self.on_success {
            f(hit);
        }
    }

    fn failure(&self, err: &ScanError) {
        if let Some(f) = &self.on_failure {
            f(err);
        }
    }
}

struct ScanSession {
    id: Uuid,
    mode: ScanMode,
    stream: Option<MediaStream>,
    /// Acquisition task, then sampler task
    task: Option<AbortHandle>,
}

#[derive(Default)]
struct SessionSlot {
    state: ScanState,
    generation: u64,
    session: Option<ScanSession>,
    error: Option<String>,
    ticks: u64,
}

impl SessionSlot {
    fn snapshot(&self) -> ScannerStatus {
        ScannerStatus {
            state: self.state,
            active: self.session.is_some(),
            error: self.error.clone(),
            ticks: self.ticks,
        }
    }
}

enum TickEvent {
    Hit(ScanHit),
    Failed(ScanError),
}

struct Shared {
    slot: Mutex<SessionSlot>,
    acquisition: CameraAcquisition,
    sampler: FrameSampler,
    decoder: Arc<dyn SymbolDecoder>,
    callbacks: Mutex<Arc<ScanCallbacks>>,
    status: watch::Sender<ScannerStatus>,
    surface: VideoSurface,
    sample_interval: Duration,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn callbacks(&self) -> Arc<ScanCallbacks> {
        Arc::clone(&self.callbacks.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn publish(&self, slot: &SessionSlot) {
        self.status.send_replace(slot.snapshot());
    }

    /// End the current session, if any, and return to Idle
    ///
    /// Leaves `error` untouched.
    fn teardown(&self, slot: &mut SessionSlot) {
        slot.generation += 1;
        if let Some(mut session) = slot.session.take() {
            slot.state = ScanState::Stopping;
            self.publish(slot);

            if let Some(task) = session.task.take() {
                task.abort();
            }
            if let Some(mut stream) = session.stream.take() {
                CameraAcquisition::release(&mut stream, &self.surface);
            }
            info!(session = %session.id, "Scan session ended");
        }
        slot.state = ScanState::Idle;
    }

    /// Acquire the stream for `generation` and arm the sampler
    ///
    /// Holds only a weak reference while waiting on the camera so dropping
    /// every controller handle still tears the session down.
    async fn run_acquisition(weak: Weak<Self>, acquisition: CameraAcquisition, generation: u64) {
        let result = acquisition.acquire().await;
        let Some(shared) = weak.upgrade() else {
            if let Ok(mut stream) = result {
                debug!(stream = %stream.id(), "Controller dropped during acquisition, releasing stream");
                stream.stop_all();
            }
            return;
        };

        let failure = {
            let mut slot = shared.lock_slot();
            if slot.generation != generation {
                if let Ok(mut stream) = result {
                    debug!(stream = %stream.id(), "Session ended during acquisition, releasing stream");
                    stream.stop_all();
                }
                return;
            }

            match result {
                Ok(stream) => {
                    CameraAcquisition::bind(&stream, &shared.surface);
                    let sampler =
                        tokio::spawn(Self::run_sampler(Arc::downgrade(&shared), generation, shared.sample_interval));
                    if let Some(session) = slot.session.as_mut() {
                        info!(session = %session.id, stream = %stream.id(), "Scanner active");
                        session.stream = Some(stream);
                        session.task = Some(sampler.abort_handle());
                    }
                    slot.state = ScanState::Active;
                    shared.publish(&slot);
                    None
                }
                Err(e) => {
                    let err = ScanError::from(e);
                    shared.teardown(&mut slot);
                    slot.error = Some(err.to_string());
                    shared.publish(&slot);
                    Some(err)
                }
            }
        };

        if let Some(err) = failure {
            shared.callbacks().failure(&err);
        }
    }

    async fn run_sampler(weak: Weak<Self>, generation: u64, period: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            if !shared.run_tick(generation) {
                break;
            }
        }
        debug!(generation, "Sampler stopped");
    }

    /// One sample/decode/branch cycle; returns whether the session goes on
    fn run_tick(&self, generation: u64) -> bool {
        let event = {
            let mut slot = self.lock_slot();
            if slot.generation != generation || slot.state != ScanState::Active {
                return false;
            }
            slot.ticks += 1;
            let tick = slot.ticks;

            let Some(sample) = self.sampler.sample(&self.surface) else {
                debug!(tick, "No frame to sample");
                self.publish(&slot);
                return true;
            };

            match self.decoder.decode(&sample) {
                Ok(DecodeOutcome::NotFound) => {
                    debug!(tick, "No barcode in frame");
                    self.publish(&slot);
                    return true;
                }
                Ok(DecodeOutcome::Found(symbol)) => {
                    let Some(session) = slot.session.as_ref() else {
                        return false;
                    };
                    let hit = ScanHit {
                        text: symbol.text,
                        symbology: symbol.symbology,
                        target: session.mode.target().cloned(),
                        tick,
                        session: session.id,
                    };
                    info!(tick, text = %hit.text, symbology = %hit.symbology, "Barcode scanned");
                    if session.mode.is_single_shot() {
                        self.teardown(&mut slot);
                    }
                    self.publish(&slot);
                    TickEvent::Hit(hit)
                }
                Err(e) => {
                    error!(tick, error = %e, "Decoder failed, stopping scanner");
                    let err = ScanError::from(e);
                    self.teardown(&mut slot);
                    slot.error = Some(err.to_string());
                    self.publish(&slot);
                    TickEvent::Failed(err)
                }
            }
        };

        let callbacks = self.callbacks();
        match event {
            TickEvent::Hit(hit) => {
                callbacks.success(&hit);
                true
            }
            TickEvent::Failed(err) => {
                callbacks.failure(&err);
                false
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(mut session) = slot.session.take() {
            warn!(session = %session.id, "Scan controller dropped with a live session");
            if let Some(task) = session.task.take() {
                task.abort();
            }
            if let Some(mut stream) = session.stream.take() {
                stream.stop_all();
            }
        }
    }
}

/// Handle to the scanner engine
///
/// Cheap to clone; all clones drive the same controller.
#[derive(Clone)]
pub struct ScanController {
    shared: Arc<Shared>,
}

impl ScanController {
    /// Controller with the default sampler and 500 ms cadence
    pub fn new(acquisition: CameraAcquisition, decoder: Arc<dyn SymbolDecoder>) -> Self {
        Self::with_options(
            acquisition,
            decoder,
            FrameSampler::default(),
            scanner_consts::SAMPLE_INTERVAL,
        )
    }

    pub fn with_options(
        acquisition: CameraAcquisition,
        decoder: Arc<dyn SymbolDecoder>,
        sampler: FrameSampler,
        sample_interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ScannerStatus::default());
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(SessionSlot::default()),
                acquisition,
                sampler,
                decoder,
                callbacks: Mutex::new(Arc::new(ScanCallbacks::default())),
                status,
                surface: VideoSurface::new(),
                sample_interval,
            }),
        }
    }

    /// Build the full engine from configuration
    pub fn from_config(config: &Config, backend: Arc<dyn CameraBackend>) -> Self {
        let acquisition = CameraAcquisition::new(backend, config.stream_constraints())
            .with_timeout(config.acquisition_timeout());
        let decoder = Arc::new(BarcodeDecoder::new(config.decode.clone()));
        let sampler = FrameSampler::new(config.crop_width_ratio, config.crop_height_ratio);
        Self::with_options(acquisition, decoder, sampler, config.sample_interval())
    }

    /// Replace the success and failure handlers
    ///
    /// Takes effect from the next tick or acquisition result.
    pub fn set_callbacks(&self, callbacks: ScanCallbacks) {
        *self.shared.callbacks.lock().unwrap_or_else(|e| e.into_inner()) = Arc::new(callbacks);
    }

    /// Start a scan session
    ///
    /// A session already running is stopped first. Clears the last error.
    /// Returns the new session id.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn start_scanner(&self, mode: ScanMode) -> Uuid {
        let id = Uuid::new_v4();
        let generation = {
            let mut slot = self.shared.lock_slot();
            if slot.session.is_some() {
                debug!("Scanner already running, restarting");
                self.shared.teardown(&mut slot);
            }
            slot.generation += 1;
            slot.error = None;
            slot.state = ScanState::Acquiring;
            slot.session = Some(ScanSession {
                id,
                mode: mode.clone(),
                stream: None,
                task: None,
            });
            self.shared.publish(&slot);
            slot.generation
        };

        info!(session = %id, mode = ?mode, "Starting scanner");

        let task = tokio::spawn(Shared::run_acquisition(
            Arc::downgrade(&self.shared),
            self.shared.acquisition.clone(),
            generation,
        ));

        let mut slot = self.shared.lock_slot();
        if slot.generation == generation
            && let Some(session) = slot.session.as_mut()
            && session.task.is_none()
        {
            session.task = Some(task.abort_handle());
        }
        id
    }

    /// Stop the current session
    ///
    /// Synchronous and idempotent. Once it returns the camera is released
    /// and no further tick decodes or calls back. The last error is kept.
    pub fn stop_scanner(&self) {
        let mut slot = self.shared.lock_slot();
        if slot.session.is_none() {
            debug!("Scanner not running, nothing to stop");
            return;
        }
        info!("Stopping scanner");
        self.shared.teardown(&mut slot);
        self.shared.publish(&slot);
    }

    /// Whether a session exists (acquiring or active)
    pub fn is_scanner_active(&self) -> bool {
        self.shared.lock_slot().session.is_some()
    }

    pub fn state(&self) -> ScanState {
        self.shared.lock_slot().state
    }

    /// Message of the last failure
    pub fn error(&self) -> Option<String> {
        self.shared.lock_slot().error.clone()
    }

    /// Sampler ticks since the controller was created
    pub fn tick_count(&self) -> u64 {
        self.shared.lock_slot().ticks
    }

    /// Id of the current session
    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.lock_slot().session.as_ref().map(|s| s.id)
    }

    /// Current status snapshot
    pub fn status(&self) -> ScannerStatus {
        self.shared.lock_slot().snapshot()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<ScannerStatus> {
        self.shared.status.subscribe()
    }

    /// Render target the camera stream is bound to
    pub fn surface(&self) -> VideoSurface {
        self.shared.surface.clone()
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("status", &self.status())
            .finish()
    }
}
