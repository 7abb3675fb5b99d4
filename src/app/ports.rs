//! Port traits: the hexagonal boundary between control-plane logic and
//! the board it runs on.
//!
//! ```text
//!   Adapter / driver ──▶ Port trait ──▶ StatusEngine, RateLimiter (domain)
//! ```
//!
//! The status engine and the rate limiter consume these traits via
//! generics, so neither touches a GPIO register or a hardware timer
//! directly and both run unchanged on the host for testing.

use std::sync::Arc;

use crate::error::Result;
use crate::status::Rgb;

// ───────────────────────────────────────────────────────────────
// Status output port (domain → LED hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the status indicator.
///
/// One implementation exists per board (see [`crate::drivers::status_led`]).
/// Boards without a multi-channel LED treat any nonzero channel as "on".
pub trait StatusOutput: Send {
    /// Configure the pins and drive the output to off.
    fn init_pins(&mut self) -> Result<()>;

    /// Render one colour. Called on every engine tick, so implementations
    /// must be cheap and must not block.
    fn set_color(&mut self, colour: Rgb);

    /// Force the output off and release the pins.
    fn cleanup(&mut self);

    /// `false` for on/off-only hardware.
    fn is_multichannel(&self) -> bool {
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (monotonic time source)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
///
/// Every deadline in the crate (detection flash, rate-limit window and
/// block, pattern phase) is computed against this, which lets tests drive
/// time explicitly.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
