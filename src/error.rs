//! Unified error types for the Hive Warden control plane.
//!
//! Only initialisation can fail. Malformed wire input, table exhaustion and
//! API misuse are handled in place (drop, evict, no-op) and never surface
//! here. All variants are `Copy` so they can be passed through the boot path
//! and logged without allocation.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible start-up operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A background task could not be created. Carries the task name.
    Spawn(&'static str),
    /// The UDP socket could not be bound to the requested port.
    Bind { port: u16, kind: io::ErrorKind },
    /// Socket configuration or reactor registration failed.
    Socket(io::ErrorKind),
    /// The status output hardware could not be initialised.
    Output(&'static str),
    /// Configuration is invalid or could not be decoded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(task) => write!(f, "spawn: failed to start task '{task}'"),
            Self::Bind { port, kind } => write!(f, "bind: port {port} unavailable ({kind})"),
            Self::Socket(kind) => write!(f, "socket: {kind}"),
            Self::Output(msg) => write!(f, "output: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
