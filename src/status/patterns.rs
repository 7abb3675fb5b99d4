//! Pattern colour function.
//!
//! Maps a resolved [`StatusId`] and the time since the engine started to
//! one RGB value. Pure and allocation-free: the engine calls it once per
//! tick, and tests call it directly with chosen timestamps.
//!
//! ## Temporal signatures
//!
//! | State            | Pattern                                   | Period  |
//! |------------------|-------------------------------------------|---------|
//! | BOOT             | Triangular breathe, blue                  | 2 s     |
//! | SETUP            | Triangular pulse, cyan                    | 3 s     |
//! | WIFI_CONNECTING  | 50% blink, blue                           | 400 ms  |
//! | UNCLAIMED        | 150 ms on/off/on, then pause, orange      | 2 s     |
//! | DISARMED         | Yellow with a 200 ms gap at cycle end     | 5 s     |
//! | ARMED            | Solid green                               |:       |
//! | OFFLINE          | 100 ms orange flash over the base colour  | 4 s     |
//! | AUTH_FAILED      | Red / orange alternation                  | 500 ms  |
//! | DETECTION        | Solid white                               |:       |
//! | CAMERA_FAIL      | 2 × 100 ms red blinks                     | 1 s     |
//! | SERVO_FAIL       | 3 × 80 ms red blinks                      | 1.25 s  |
//! | LASER_FAIL       | 4 × 60 ms red blinks                      | 1.5 s   |
//! | ERROR            | 50% blink, red                            | 1 s     |

use super::{StatusId, StatusSet};

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

// ── Colours ───────────────────────────────────────────────────

pub const COLOUR_OFF: Rgb = (0, 0, 0);
pub const COLOUR_RED: Rgb = (255, 0, 0);
pub const COLOUR_GREEN: Rgb = (0, 255, 0);
pub const COLOUR_BLUE: Rgb = (0, 0, 255);
pub const COLOUR_YELLOW: Rgb = (255, 255, 0);
pub const COLOUR_ORANGE: Rgb = (255, 128, 0);
pub const COLOUR_WHITE: Rgb = (255, 255, 255);
pub const COLOUR_CYAN: Rgb = (0, 255, 255);

// ── Timing (milliseconds) ─────────────────────────────────────

pub const BOOT_BREATHE_MS: u64 = 2_000;
pub const SETUP_PULSE_MS: u64 = 3_000;
pub const WIFI_BLINK_MS: u64 = 400;
pub const UNCLAIMED_HEARTBEAT_MS: u64 = 2_000;
const UNCLAIMED_PULSE_MS: u64 = 150;
pub const DISARMED_GAP_PERIOD_MS: u64 = 5_000;
const DISARMED_GAP_MS: u64 = 200;
pub const OFFLINE_FLASH_PERIOD_MS: u64 = 4_000;
const OFFLINE_FLASH_MS: u64 = 100;
pub const AUTH_FAIL_BLINK_MS: u64 = 500;
pub const CAMERA_FAIL_PERIOD_MS: u64 = 1_000;
pub const SERVO_FAIL_PERIOD_MS: u64 = 1_250;
pub const LASER_FAIL_PERIOD_MS: u64 = 1_500;
pub const ERROR_BLINK_MS: u64 = 1_000;

/// Cycle length of `state`'s pattern, or `None` for solid states.
pub const fn period_ms(state: StatusId) -> Option<u64> {
    match state {
        StatusId::Boot => Some(BOOT_BREATHE_MS),
        StatusId::Setup => Some(SETUP_PULSE_MS),
        StatusId::WifiConnecting => Some(WIFI_BLINK_MS),
        StatusId::Unclaimed => Some(UNCLAIMED_HEARTBEAT_MS),
        StatusId::Disarmed => Some(DISARMED_GAP_PERIOD_MS),
        StatusId::Offline => Some(OFFLINE_FLASH_PERIOD_MS),
        StatusId::AuthFailed => Some(AUTH_FAIL_BLINK_MS),
        StatusId::CameraFail => Some(CAMERA_FAIL_PERIOD_MS),
        StatusId::ServoFail => Some(SERVO_FAIL_PERIOD_MS),
        StatusId::LaserFail => Some(LASER_FAIL_PERIOD_MS),
        StatusId::Error => Some(ERROR_BLINK_MS),
        StatusId::Off | StatusId::Armed | StatusId::Detection => None,
    }
}

/// Colour under an OFFLINE overlay: the pattern colour of the most
/// important "mode" state that is asserted, shown steadily.
pub fn base_colour(active: StatusSet) -> Rgb {
    const BASES: [(StatusId, Rgb); 6] = [
        (StatusId::Armed, COLOUR_GREEN),
        (StatusId::Disarmed, COLOUR_YELLOW),
        (StatusId::Unclaimed, COLOUR_ORANGE),
        (StatusId::WifiConnecting, COLOUR_BLUE),
        (StatusId::Setup, COLOUR_CYAN),
        (StatusId::Boot, COLOUR_BLUE),
    ];
    BASES
        .iter()
        .find(|(id, _)| active.contains(*id))
        .map_or(COLOUR_OFF, |(_, colour)| *colour)
}

/// Colour for `state` at `elapsed_ms` since the engine started.
///
/// `base` is only consulted for OFFLINE (see [`base_colour`]).
pub fn pattern_colour(state: StatusId, elapsed_ms: u64, base: Rgb) -> Rgb {
    let pos = period_ms(state).map_or(0, |period| elapsed_ms % period);

    match state {
        StatusId::Off => COLOUR_OFF,
        StatusId::Boot => scale(COLOUR_BLUE, triangle_brightness(pos, BOOT_BREATHE_MS)),
        StatusId::Setup => scale(COLOUR_CYAN, triangle_brightness(pos, SETUP_PULSE_MS)),
        StatusId::WifiConnecting => on_off(pos < WIFI_BLINK_MS / 2, COLOUR_BLUE),
        StatusId::Unclaimed => on_off(blink_code(pos, UNCLAIMED_PULSE_MS, 2), COLOUR_ORANGE),
        StatusId::Disarmed => on_off(
            pos < DISARMED_GAP_PERIOD_MS - DISARMED_GAP_MS,
            COLOUR_YELLOW,
        ),
        StatusId::Armed => COLOUR_GREEN,
        StatusId::Offline => {
            if pos < OFFLINE_FLASH_MS {
                COLOUR_ORANGE
            } else {
                base
            }
        }
        StatusId::AuthFailed => {
            if pos < AUTH_FAIL_BLINK_MS / 2 {
                COLOUR_RED
            } else {
                COLOUR_ORANGE
            }
        }
        StatusId::Detection => COLOUR_WHITE,
        StatusId::CameraFail => on_off(blink_code(pos, 100, 2), COLOUR_RED),
        StatusId::ServoFail => on_off(blink_code(pos, 80, 3), COLOUR_RED),
        StatusId::LaserFail => on_off(blink_code(pos, 60, 4), COLOUR_RED),
        StatusId::Error => on_off(pos < ERROR_BLINK_MS / 2, COLOUR_RED),
    }
}

/// Full render step: pattern of `state`, with the OFFLINE base taken from
/// `active`.
pub fn render(state: StatusId, elapsed_ms: u64, active: StatusSet) -> Rgb {
    pattern_colour(state, elapsed_ms, base_colour(active))
}

/// Single-channel view of a colour: any nonzero channel is "on".
pub const fn is_lit(colour: Rgb) -> bool {
    colour.0 > 0 || colour.1 > 0 || colour.2 > 0
}

// ── Helpers ───────────────────────────────────────────────────

fn on_off(on: bool, colour: Rgb) -> Rgb {
    if on { colour } else { COLOUR_OFF }
}

/// `count` pulses of `on_ms`, each followed by an equal gap, starting at
/// the top of the cycle; dark for the rest of the cycle.
fn blink_code(pos: u64, on_ms: u64, count: u64) -> bool {
    let slot = pos / on_ms;
    slot < count * 2 && slot % 2 == 0
}

/// Triangular brightness: ramps 0→255→0 over `period_ms`, no libm.
fn triangle_brightness(pos: u64, period_ms: u64) -> u8 {
    let pos = pos % period_ms;
    let half = period_ms / 2;
    if pos < half {
        ((pos * 255) / half) as u8
    } else {
        (((period_ms - pos) * 255) / half) as u8
    }
}

fn scale(colour: Rgb, brightness: u8) -> Rgb {
    let br = brightness as u16;
    let (r, g, b) = colour;
    (
        ((r as u16 * br) / 255) as u8,
        ((g as u16 * br) / 255) as u8,
        ((b as u16 * br) / 255) as u8,
    )
}
