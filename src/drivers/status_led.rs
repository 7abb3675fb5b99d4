//! Status LED output backends.
//!
//! | Backend            | Board                      | Colour handling          |
//! |--------------------|----------------------------|--------------------------|
//! | `SingleChannelLed` | ESP32-CAM (GPIO 33)        | any channel lit ⇒ on     |
//! | `PwmRgbLed`        | Pi / discrete RGB LED      | per-channel duty 0–255   |
//! | `SimStatusLed`     | host / test                | tracked in memory        |
//!
//! Hardware backends are generic over the `embedded-hal` 1.0 traits, so
//! the same code drives an `esp-idf-hal` `PinDriver` / `LedcDriver` on the
//! device and a mock pin in tests.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::StatusOutput;
use crate::error::{Error, Result};
use crate::status::patterns::{COLOUR_OFF, is_lit};
use crate::status::Rgb;

// ── Simulation ────────────────────────────────────────────────

/// In-memory LED for host runs. Logs colour changes only.
#[derive(Debug, Default)]
pub struct SimStatusLed {
    current: Rgb,
    writes: u64,
    pins_ready: bool,
}

impl SimStatusLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }

    /// Total `set_color` calls since construction.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn pins_ready(&self) -> bool {
        self.pins_ready
    }
}

impl StatusOutput for SimStatusLed {
    fn init_pins(&mut self) -> Result<()> {
        self.pins_ready = true;
        self.current = COLOUR_OFF;
        debug!("led(sim): pins initialised");
        Ok(())
    }

    fn set_color(&mut self, colour: Rgb) {
        self.writes += 1;
        if colour != self.current {
            debug!("led(sim): {:?} -> {:?}", self.current, colour);
            self.current = colour;
        }
    }

    fn cleanup(&mut self) {
        self.current = COLOUR_OFF;
        self.pins_ready = false;
        debug!("led(sim): cleanup");
    }
}

// ── Single-channel GPIO ───────────────────────────────────────

/// One on/off LED (active high).
pub struct SingleChannelLed<P> {
    pin: P,
    lit: Option<bool>,
}

impl<P: OutputPin + Send> SingleChannelLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, lit: None }
    }

    /// Last level driven, `None` before the first write.
    pub fn is_on(&self) -> Option<bool> {
        self.lit
    }

    fn drive(&mut self, on: bool) -> core::result::Result<(), P::Error> {
        if self.lit == Some(on) {
            return Ok(());
        }
        if on {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.lit = Some(on);
        Ok(())
    }
}

impl<P: OutputPin + Send> StatusOutput for SingleChannelLed<P> {
    fn init_pins(&mut self) -> Result<()> {
        self.lit = None;
        self.drive(false).map_err(|e| {
            warn!("led: pin init failed: {e:?}");
            Error::Output("status led pin")
        })
    }

    fn set_color(&mut self, colour: Rgb) {
        if let Err(e) = self.drive(is_lit(colour)) {
            warn!("led: pin write failed: {e:?}");
        }
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.drive(false) {
            warn!("led: pin release failed: {e:?}");
        }
    }

    fn is_multichannel(&self) -> bool {
        false
    }
}

// ── PWM RGB ───────────────────────────────────────────────────

/// Three PWM channels, one per colour component.
pub struct PwmRgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    current: Rgb,
}

impl<R, G, B> PwmRgbLed<R, G, B>
where
    R: SetDutyCycle + Send,
    G: SetDutyCycle + Send,
    B: SetDutyCycle + Send,
{
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self {
            red,
            green,
            blue,
            current: COLOUR_OFF,
        }
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }

    fn write(&mut self, (r, g, b): Rgb) -> bool {
        let mut ok = true;
        ok &= set_channel(&mut self.red, r, "red");
        ok &= set_channel(&mut self.green, g, "green");
        ok &= set_channel(&mut self.blue, b, "blue");
        if ok {
            self.current = (r, g, b);
        }
        ok
    }
}

fn set_channel<P: SetDutyCycle>(ch: &mut P, level: u8, name: &str) -> bool {
    match ch.set_duty_cycle_fraction(u16::from(level), 255) {
        Ok(()) => true,
        Err(e) => {
            warn!("led: {name} channel write failed: {e:?}");
            false
        }
    }
}

impl<R, G, B> StatusOutput for PwmRgbLed<R, G, B>
where
    R: SetDutyCycle + Send,
    G: SetDutyCycle + Send,
    B: SetDutyCycle + Send,
{
    fn init_pins(&mut self) -> Result<()> {
        if self.write(COLOUR_OFF) {
            Ok(())
        } else {
            Err(Error::Output("status led pwm"))
        }
    }

    fn set_color(&mut self, colour: Rgb) {
        if colour != self.current {
            self.write(colour);
        }
    }

    fn cleanup(&mut self) {
        self.write(COLOUR_OFF);
    }
}
