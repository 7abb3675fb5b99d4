//! Application boundary: port traits consumed by the control-plane
//! services and implemented by drivers and adapters.

pub mod ports;
