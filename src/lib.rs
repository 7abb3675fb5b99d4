//! Hive Warden edge unit: local control-plane library.
//!
//! Three leaf services, each owning fixed-size state:
//!
//! - [`status::StatusEngine`]: priority-overlay status LED with a
//!   background render loop.
//! - [`adapters::captive_dns::CaptiveDns`]: answers every DNS A query
//!   with the setup address while the device is unprovisioned.
//! - [`auth::rate_limit::RateLimiter`]: per-client sliding-window
//!   admission control for the local auth endpoint.
//!
//! Exposed as a library for integration testing; all ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod auth;
pub mod config;
pub mod dns;
pub mod drivers;
pub mod pins;
pub mod status;

mod error;
mod esp_link_shims;

pub use error::{Error, Result};
