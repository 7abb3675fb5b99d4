//! Device configuration parameters.
//!
//! Tunables for the three control-plane services. Defaults match the
//! field-proven constants; values may be overridden by a provisioning
//! payload (JSON) or a persisted blob (postcard).
//!
//! Table capacity and key length of the rate limiter are *not* here: they
//! size fixed storage and live as constants in [`crate::auth::rate_limit`].

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub status: StatusConfig,
    pub dns: DnsConfig,
    pub rate_limit: RateLimitConfig,
}

/// Status LED engine timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Render period of the background loop (milliseconds)
    pub tick_ms: u32,
    /// Duration of the detection flash overlay (milliseconds)
    pub flash_ms: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,   // 20 Hz
            flash_ms: 200,
        }
    }
}

/// Captive-portal DNS responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// UDP port to listen on (0 = ephemeral, used by tests)
    pub port: u16,
    pub bind_addr: Ipv4Addr,
    /// Address every A query is answered with (the soft-AP gateway)
    pub redirect: Ipv4Addr,
    /// Upper bound on a single receive wait (milliseconds)
    pub recv_timeout_ms: u32,
    /// How long `stop()` waits for the loop to exit (milliseconds)
    pub stop_grace_ms: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            port: 53,
            bind_addr: Ipv4Addr::UNSPECIFIED,
            redirect: Ipv4Addr::new(192, 168, 4, 1),
            recv_timeout_ms: 1_000,
            stop_grace_ms: 200,
        }
    }
}

/// Local-auth brute-force protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Failures within one window that trigger a block
    pub max_failures: u8,
    /// Sliding window length (seconds)
    pub window_secs: u32,
    /// Block duration once the threshold is reached (seconds)
    pub block_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_secs: 60,
            block_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window_ms(&self) -> u64 {
        u64::from(self.window_secs) * 1_000
    }

    pub fn block_ms(&self) -> u64 {
        u64::from(self.block_secs) * 1_000
    }
}

impl DeviceConfig {
    /// Reject values that would stall a loop or disable a protection.
    pub fn validate(&self) -> Result<()> {
        if self.status.tick_ms == 0 {
            return Err(Error::Config("status.tick_ms must be nonzero"));
        }
        if self.status.flash_ms == 0 {
            return Err(Error::Config("status.flash_ms must be nonzero"));
        }
        if self.dns.recv_timeout_ms == 0 {
            return Err(Error::Config("dns.recv_timeout_ms must be nonzero"));
        }
        if self.dns.stop_grace_ms == 0 {
            return Err(Error::Config("dns.stop_grace_ms must be nonzero"));
        }
        if self.rate_limit.max_failures == 0 {
            return Err(Error::Config("rate_limit.max_failures must be nonzero"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(Error::Config("rate_limit.window_secs must be nonzero"));
        }
        if self.rate_limit.block_secs == 0 {
            return Err(Error::Config("rate_limit.block_secs must be nonzero"));
        }
        Ok(())
    }

    /// Parse and validate a provisioning payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| {
            log::warn!("config: JSON rejected: {e}");
            Error::Config("malformed JSON")
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::Config("JSON encode failed"))
    }

    /// Compact persisted form.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("blob encode failed"))
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        let cfg: Self = postcard::from_bytes(bytes).map_err(|e| {
            log::warn!("config: blob rejected: {e}");
            Error::Config("malformed blob")
        })?;
        cfg.validate()?;
        Ok(cfg)
    }
}
