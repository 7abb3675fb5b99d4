//! Status engine: owns the active-state set and the background render
//! loop.
//!
//! ```text
//!   set_state / clear_state / flash_detection
//!                  │
//!                  ▼
//!   ┌──────────── Mutex ─────────────┐        every tick_ms
//!   │ active · flash deadline ·      │ ◀──── "status-led" task
//!   │ last colour · output device    │        resolve → render → write
//!   └────────────────────────────────┘
//! ```
//!
//! All methods take `&self`; share the engine behind an `Arc` or a
//! `static`. Calls before [`StatusEngine::init`] are logged no-ops.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use super::patterns::{self, COLOUR_OFF, Rgb};
use super::{StatusId, StatusSet};
use crate::adapters::time::MonotonicClock;
use crate::app::ports::{Clock, StatusOutput};
use crate::config::StatusConfig;
use crate::drivers::task_pin::{STATUS_TASK, spawn_on_core};
use crate::error::{Error, Result};

/// Shutdown polls the worker this many times before the final grace tick.
const JOIN_POLLS: u32 = 10;
/// Added to each poll interval to cover scheduler latency.
const JOIN_SLACK_MS: u64 = 10;

// ── Shared state ──────────────────────────────────────────────

struct Inner<O> {
    active: StatusSet,
    flash_until_ms: u64,
    last_colour: Rgb,
    output: O,
}

impl<O> Inner<O> {
    fn resolve(&self, now_ms: u64) -> StatusId {
        if now_ms < self.flash_until_ms {
            StatusId::Detection
        } else {
            self.active.highest()
        }
    }
}

struct Shared<O, C> {
    inner: Mutex<Inner<O>>,
    clock: C,
    epoch_ms: AtomicU64,
    /// Bumped by every `init`; a loop only owns the output while it matches.
    session: AtomicU64,
}

/// One render session. The flag is per session so a detached loop from an
/// earlier session never observes a later `init`.
struct Worker {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl<O: StatusOutput, C: Clock> Shared<O, C> {
    fn lock(&self) -> MutexGuard<'_, Inner<O>> {
        // A panic inside an output backend must not wedge the API.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_once(&self, running: &AtomicBool) {
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.epoch_ms.load(Ordering::Acquire));

        let mut inner = self.lock();
        if !running.load(Ordering::Acquire) {
            return;
        }
        let state = inner.resolve(now);
        let colour = patterns::render(state, elapsed, inner.active);
        inner.output.set_color(colour);
        inner.last_colour = colour;
    }

    fn run(&self, tick: Duration, running: &AtomicBool, session: u64) {
        debug!("status: render loop {session} started (tick={}ms)", tick.as_millis());
        while running.load(Ordering::Acquire) {
            self.render_once(running);
            thread::sleep(tick);
        }

        let mut inner = self.lock();
        if self.session.load(Ordering::Acquire) == session {
            inner.output.set_color(COLOUR_OFF);
            inner.last_colour = COLOUR_OFF;
        }
        debug!("status: render loop {session} exited");
    }
}

// ── Summary ───────────────────────────────────────────────────

/// Human-readable view of the asserted states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    NotInitialized,
    Off,
    Active(StatusSet),
}

impl Summary {
    fn of(set: StatusSet) -> Self {
        let mut shown = set;
        shown.remove(StatusId::Off);
        if shown.is_empty() {
            Self::Off
        } else {
            Self::Active(shown)
        }
    }

    /// Number of asserted states (OFF is never counted).
    pub fn count(&self) -> usize {
        match self {
            Self::NotInitialized | Self::Off => 0,
            Self::Active(set) => set.len(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("NOT_INITIALIZED"),
            Self::Off => f.write_str("OFF"),
            Self::Active(set) => {
                for (i, id) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str(id.name())?;
                }
                Ok(())
            }
        }
    }
}

// ── Engine ────────────────────────────────────────────────────

/// Priority-overlay status indicator.
pub struct StatusEngine<O, C = MonotonicClock>
where
    O: StatusOutput + 'static,
    C: Clock,
{
    shared: Arc<Shared<O, C>>,
    config: StatusConfig,
    initialized: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl<O: StatusOutput + 'static> StatusEngine<O, MonotonicClock> {
    /// Engine with the default timing and the system monotonic clock.
    pub fn with_defaults(output: O) -> Self {
        Self::new(output, MonotonicClock::new(), StatusConfig::default())
    }
}

impl<O, C> StatusEngine<O, C>
where
    O: StatusOutput + 'static,
    C: Clock,
{
    pub fn new(output: O, clock: C, config: StatusConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    active: StatusSet::EMPTY,
                    flash_until_ms: 0,
                    last_colour: COLOUR_OFF,
                    output,
                }),
                clock,
                epoch_ms: AtomicU64::new(0),
                session: AtomicU64::new(0),
            }),
            config,
            initialized: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    fn live(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure the output and start the render loop.
    ///
    /// A second call while running is a no-op. Calling again after
    /// [`cleanup`](Self::cleanup) starts a fresh session.
    pub fn init(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        if self.live() {
            warn!("status: init called twice, ignoring");
            return Ok(());
        }

        {
            let mut inner = self.shared.lock();
            inner.output.init_pins().inspect_err(|e| {
                error!("status: output init failed: {e}");
            })?;
            inner.active = StatusSet::EMPTY;
            inner.flash_until_ms = 0;
            inner.last_colour = COLOUR_OFF;
        }

        self.shared
            .epoch_ms
            .store(self.shared.clock.now_ms(), Ordering::Release);
        let session = self.shared.session.fetch_add(1, Ordering::AcqRel) + 1;
        let running = Arc::new(AtomicBool::new(true));

        let shared = Arc::clone(&self.shared);
        let flag = Arc::clone(&running);
        let tick = Duration::from_millis(u64::from(self.config.tick_ms));
        match spawn_on_core(STATUS_TASK, move || shared.run(tick, &flag, session)) {
            Ok(handle) => *worker = Some(Worker { handle, running }),
            Err(e) => {
                error!("status: render task spawn failed: {e}");
                self.shared.lock().output.cleanup();
                return Err(Error::Spawn(STATUS_TASK.display_name()));
            }
        }

        self.initialized.store(true, Ordering::Release);
        let multichannel = self.shared.lock().output.is_multichannel();
        info!(
            "status: engine started (tick={}ms, flash={}ms, {})",
            self.config.tick_ms,
            self.config.flash_ms,
            if multichannel { "rgb" } else { "single-channel" }
        );
        Ok(())
    }

    /// Stop the render loop, force the output off and forget all states.
    pub fn cleanup(&self) {
        let mut worker = self.lock_worker();
        if !self.live() {
            debug!("status: cleanup before init, ignoring");
            return;
        }

        if let Some(Worker { handle, running }) = worker.take() {
            running.store(false, Ordering::Release);
            self.join_bounded(handle);
        }

        {
            let mut inner = self.shared.lock();
            inner.output.set_color(COLOUR_OFF);
            inner.last_colour = COLOUR_OFF;
            inner.active = StatusSet::EMPTY;
            inner.flash_until_ms = 0;
            inner.output.cleanup();
        }

        self.initialized.store(false, Ordering::Release);
        info!("status: engine stopped");
    }

    fn join_bounded(&self, handle: JoinHandle<()>) {
        let tick_ms = u64::from(self.config.tick_ms);
        let poll = Duration::from_millis(tick_ms + JOIN_SLACK_MS);

        for _ in 0..JOIN_POLLS {
            if handle.is_finished() {
                break;
            }
            thread::sleep(poll);
        }
        if !handle.is_finished() {
            thread::sleep(Duration::from_millis(tick_ms));
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("status: render task panicked");
            }
        } else {
            // Dropping the handle detaches; the loop exits on its next check.
            warn!("status: render task still running after grace period, detaching");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.live()
    }

    // ── State API ─────────────────────────────────────────────

    /// Assert `id`. Idempotent.
    pub fn set_state(&self, id: StatusId) {
        if !self.live() {
            return;
        }
        if self.shared.lock().active.insert(id) {
            debug!("status: +{id}");
        }
    }

    /// Withdraw `id`. Idempotent.
    pub fn clear_state(&self, id: StatusId) {
        if !self.live() {
            return;
        }
        if self.shared.lock().active.remove(id) {
            debug!("status: -{id}");
        }
    }

    /// [`set_state`](Self::set_state) for a numeric identifier; out-of-range
    /// values are ignored.
    pub fn set_state_raw(&self, raw: u8) {
        match StatusId::try_from(raw) {
            Ok(id) => self.set_state(id),
            Err(e) => debug!("status: set ignored, {e}"),
        }
    }

    pub fn clear_state_raw(&self, raw: u8) {
        match StatusId::try_from(raw) {
            Ok(id) => self.clear_state(id),
            Err(e) => debug!("status: clear ignored, {e}"),
        }
    }

    /// The state currently being rendered: DETECTION while a flash is live,
    /// otherwise the highest-priority asserted state (OFF when none).
    pub fn get_state(&self) -> StatusId {
        if !self.live() {
            return StatusId::Off;
        }
        let now = self.shared.clock.now_ms();
        self.shared.lock().resolve(now)
    }

    /// Raw membership, independent of priority and of the flash overlay.
    pub fn is_state_active(&self, id: StatusId) -> bool {
        self.live() && self.shared.lock().active.contains(id)
    }

    /// Override the indicator with DETECTION for `flash_ms`. Expires on
    /// its own; re-flashing extends the deadline.
    pub fn flash_detection(&self) {
        if !self.live() {
            return;
        }
        let until = self.shared.clock.now_ms() + u64::from(self.config.flash_ms);
        self.shared.lock().flash_until_ms = until;
        debug!("status: detection flash until t={until}ms");
    }

    pub fn active_summary(&self) -> Summary {
        if !self.live() {
            return Summary::NotInitialized;
        }
        Summary::of(self.shared.lock().active)
    }

    /// Last colour written to the output.
    pub fn current_colour(&self) -> Rgb {
        self.shared.lock().last_colour
    }
}

impl<O, C> Drop for StatusEngine<O, C>
where
    O: StatusOutput + 'static,
    C: Clock,
{
    fn drop(&mut self) {
        if self.live() {
            self.cleanup();
        }
    }
}
