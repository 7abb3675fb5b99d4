//! Adapters: concrete implementations behind the port traits.
//!
//! | Adapter       | Implements / provides | Connects to            |
//! |---------------|-----------------------|------------------------|
//! | `captive_dns` | UDP/53 responder      | lwIP / host UDP socket |
//! | `time`        | Clock                 | ESP32 system timer     |

pub mod captive_dns;
pub mod time;
