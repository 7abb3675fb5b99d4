//! Output drivers and task helpers.

pub mod status_led;
pub mod task_pin;
