//! Mock status output and clock for integration tests.
//!
//! Records every output call so tests can assert on the full command
//! history without touching real GPIO/PWM registers. The engine owns the
//! output, so the log lives behind an `Arc` shared with the test.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use hivewarden::Error;
use hivewarden::adapters::time::ManualClock;
use hivewarden::app::ports::{Clock, StatusOutput};
use hivewarden::status::Rgb;

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCall {
    InitPins,
    SetColor(Rgb),
    Cleanup,
}

// ── MockLed ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockLed {
    calls: Arc<Mutex<Vec<OutputCall>>>,
    fail_init: bool,
}

#[allow(dead_code)]
impl MockLed {
    pub fn new() -> Self {
        Self::default()
    }

    /// An LED whose `init_pins` always fails.
    pub fn broken() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    fn log(&self) -> MutexGuard<'_, Vec<OutputCall>> {
        self.calls.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.log().clone()
    }

    pub fn count(&self, call: OutputCall) -> usize {
        self.log().iter().filter(|c| **c == call).count()
    }

    pub fn last_colour(&self) -> Option<Rgb> {
        self.log().iter().rev().find_map(|c| match c {
            OutputCall::SetColor(rgb) => Some(*rgb),
            _ => None,
        })
    }

    pub fn colour_writes(&self) -> usize {
        self.log()
            .iter()
            .filter(|c| matches!(c, OutputCall::SetColor(_)))
            .count()
    }

    pub fn saw_colour(&self, colour: Rgb) -> bool {
        self.log().contains(&OutputCall::SetColor(colour))
    }

    pub fn clear(&self) {
        self.log().clear();
    }
}

impl StatusOutput for MockLed {
    fn init_pins(&mut self) -> hivewarden::Result<()> {
        self.log().push(OutputCall::InitPins);
        if self.fail_init {
            Err(Error::Output("mock led"))
        } else {
            Ok(())
        }
    }

    fn set_color(&mut self, colour: Rgb) {
        self.log().push(OutputCall::SetColor(colour));
    }

    fn cleanup(&mut self) {
        self.log().push(OutputCall::Cleanup);
    }
}

// ── StallingClock ─────────────────────────────────────────────

/// Manual clock that can wedge one render thread inside `now_ms`, the way a
/// starved task looks to a shutdown with a bounded join.
#[derive(Default)]
pub struct StallingClock {
    time: ManualClock,
    armed: AtomicBool,
    released: AtomicBool,
    stalled: Mutex<Option<ThreadId>>,
    renderers: Mutex<HashSet<ThreadId>>,
}

#[allow(dead_code)]
impl StallingClock {
    /// The next render-thread call blocks until [`release`](Self::release).
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn stalled(&self) -> Option<ThreadId> {
        *self.stalled.lock().unwrap()
    }

    /// Distinct render threads that read the clock since the last call.
    pub fn take_renderers(&self) -> HashSet<ThreadId> {
        std::mem::take(&mut *self.renderers.lock().unwrap())
    }
}

impl Clock for StallingClock {
    fn now_ms(&self) -> u64 {
        let me = thread::current();
        if me.name() == Some("status-led") {
            self.renderers.lock().unwrap().insert(me.id());
            if self.armed.swap(false, Ordering::AcqRel) {
                *self.stalled.lock().unwrap() = Some(me.id());
                while !self.released.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        self.time.now_ms()
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
