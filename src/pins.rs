//! GPIO pin assignments for the status LED on each supported board.
//!
//! Single source of truth: the output backends and `main()` reference
//! this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Raspberry Pi carrier (discrete RGB LED, software or hardware PWM)
// ---------------------------------------------------------------------------

/// Red channel of the RGB status LED.
pub const PI_LED_RED_GPIO: i32 = 24;
/// Green channel of the RGB status LED.
pub const PI_LED_GREEN_GPIO: i32 = 25;
/// Blue channel of the RGB status LED.
pub const PI_LED_BLUE_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// ESP32-CAM (single red LED, on/off only)
// ---------------------------------------------------------------------------

/// Built-in red LED. The board has no green or blue channel, so the
/// single-channel backend is used.
pub const ESP32_LED_GPIO: i32 = 33;
