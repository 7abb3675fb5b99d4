//! Runtime symbol providers for third-party crates.
//!
//! `async-io-mini` timers sit on `embassy-time-driver`, which resolves its
//! clock and wake scheduler at link time. Both targets get them here. On
//! ESP-IDF the `critical-section` pair is provided as well; host builds take
//! it from the `critical-section/std` implementation.
//!
//! Ticks are microseconds, the driver's default rate.

use core::task::Waker;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use log::error;

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};

// ── Critical section (ESP-IDF) ────────────────────────────────

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Runtime-backed critical-section acquire used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                let lock = CRITICAL_SECTION_MUTEX
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                *guard.borrow_mut() = Some(lock);
            }
            let new_depth = d.saturating_add(1);
            depth.set(new_depth);
            new_depth
        })
    })
}

/// Runtime-backed critical-section release used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                return;
            }
            let new_depth = d - 1;
            depth.set(new_depth);
            if new_depth == 0 {
                *guard.borrow_mut() = None;
            }
        })
    })
}

// ── Time driver ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn now_us() -> u64 {
    // SAFETY: reads the monotonic system timer; no preconditions.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

#[cfg(not(target_os = "espidf"))]
fn now_us() -> u64 {
    static ORIGIN: OnceLock<std::time::Instant> = OnceLock::new();
    ORIGIN
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_micros() as u64
}

#[unsafe(no_mangle)]
fn _embassy_time_now() -> u64 {
    now_us()
}

#[unsafe(no_mangle)]
fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    WAKEUPS.schedule(at, waker);
}

/// Pending wakeups, drained by one "time-driver" thread.
struct WakeQueue {
    pending: Mutex<Vec<(u64, Waker)>>,
    changed: Condvar,
}

static WAKEUPS: WakeQueue = WakeQueue {
    pending: Mutex::new(Vec::new()),
    changed: Condvar::new(),
};

static DRIVER_STARTED: OnceLock<bool> = OnceLock::new();

impl WakeQueue {
    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Waker)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(&'static self, at: u64, waker: &Waker) {
        let started = *DRIVER_STARTED.get_or_init(|| {
            thread::Builder::new()
                .name("time-driver".into())
                .stack_size(8 * 1024)
                .spawn(move || self.run())
                .inspect_err(|e| error!("time driver: thread spawn failed: {e}"))
                .is_ok()
        });
        if !started {
            // Degrades to polling rather than a timer that never fires.
            waker.wake_by_ref();
            return;
        }

        let mut pending = self.lock();
        match pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
            Some(slot) => slot.0 = slot.0.min(at),
            None => pending.push((at, waker.clone())),
        }
        drop(pending);
        self.changed.notify_one();
    }

    fn run(&self) {
        let mut due = Vec::new();
        loop {
            let mut pending = self.lock();
            loop {
                let now = now_us();
                pending.retain(|(at, w)| {
                    if *at <= now {
                        due.push(w.clone());
                        false
                    } else {
                        true
                    }
                });
                if !due.is_empty() {
                    break;
                }
                pending = match pending.iter().map(|(at, _)| *at).min() {
                    Some(next) => {
                        let wait = Duration::from_micros(next - now);
                        self.changed
                            .wait_timeout(pending, wait)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0
                    }
                    None => self
                        .changed
                        .wait(pending)
                        .unwrap_or_else(PoisonError::into_inner),
                };
            }
            drop(pending);

            // Wakers may re-enter the scheduler, so fire them unlocked.
            for waker in due.drain(..) {
                waker.wake();
            }
        }
    }
}
