//! Hive Warden edge unit: ESP-IDF entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters / drivers                        │
//! │  SingleChannelLed(GPIO33)   CaptiveDns(UDP/53)   Monotonic   │
//! │  ─────────────── Port Trait Boundary ────────────────────    │
//! │  StatusEngine (render task)      RateLimiter (auth path)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Boot brings up the status LED, then starts the captive portal's DNS
//! responder while the unit is unprovisioned. The auth rate limiter is
//! built here; this binary only reports its table size in the heartbeat.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::info;

use hivewarden::adapters::captive_dns::CaptiveDns;
use hivewarden::auth::RateLimiter;
use hivewarden::config::DeviceConfig;
use hivewarden::drivers::status_led::SingleChannelLed;
use hivewarden::pins;
use hivewarden::status::{StatusEngine, StatusId};

const HEARTBEAT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Hive Warden v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = DeviceConfig::default();
    config.validate()?;

    // ── 2. Status LED ─────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let led_pin = PinDriver::output(peripherals.pins.gpio33)?;
    info!("Status LED on GPIO {}", pins::ESP32_LED_GPIO);

    let status = StatusEngine::new(
        SingleChannelLed::new(led_pin),
        hivewarden::adapters::time::MonotonicClock::new(),
        config.status,
    );
    status.init()?;
    status.set_state(StatusId::Boot);

    // ── 3. Auth rate limiter ──────────────────────────────────
    let limiter = Mutex::new(RateLimiter::new(
        config.rate_limit,
        hivewarden::adapters::time::MonotonicClock::new(),
    ));

    // ── 4. Captive portal ─────────────────────────────────────
    let mut dns = CaptiveDns::new(config.dns);
    status.clear_state(StatusId::Boot);
    status.set_state(StatusId::Setup);
    if let Err(e) = dns.start(config.dns.redirect) {
        log::error!("Captive DNS failed to start: {e}");
        status.set_state(StatusId::Error);
    }

    // ── 5. Idle ───────────────────────────────────────────────
    loop {
        std::thread::sleep(HEARTBEAT);
        let tracked = limiter.lock().map(|l| l.len()).unwrap_or(0);
        let stats = dns.stats();
        info!(
            "Heartbeat: status=[{}] dns(answered={}, dropped={}) auth_tracked={}",
            status.active_summary(),
            stats.answered,
            stats.dropped,
            tracked
        );
    }
}
