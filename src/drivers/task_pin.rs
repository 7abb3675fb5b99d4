//! Named, core-pinned background tasks.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::Builder::spawn`
//! creates a FreeRTOS task pinned to a specific CPU core with explicit
//! priority and stack size. On non-ESP targets, falls back to a plain
//! named thread.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration consumed by the
//! *next* `pthread_create()` on the calling thread, so the config→spawn
//! pair must not be interleaved with other thread creation on the same
//! thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the dual-core ESP32 family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks (WiFi, lwIP).
    Pro = 0,
    /// Core 1 (APP_CPU): application logic.
    App = 1,
}

/// Background task parameters.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Null-terminated on ESP-IDF (e.g. `"status-led\0"`).
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    /// Name without the trailing NUL, for logs and `std::thread` names.
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Status LED tick loop. Low priority, small stack.
pub const STATUS_TASK: TaskSpec = TaskSpec {
    name: "status-led\0",
    core: Core::App,
    priority: 2,
    stack_kb: 4,
};

/// Captive-portal DNS responder. Shares the protocol core with lwIP and
/// stays below the HTTP server (priority 5).
pub const DNS_TASK: TaskSpec = TaskSpec {
    name: "captive-dns\0",
    core: Core::Pro,
    priority: 4,
    stack_kb: 8,
};

/// Spawn a thread pinned to `spec.core` with the given priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    debug_assert!(spec.name.ends_with('\0'), "task name must be NUL-terminated");

    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK as i32 {
            return Err(io::Error::other(format!(
                "esp_pthread_set_cfg failed: {ret}"
            )));
        }
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    log::debug!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    // Host threads need more headroom than the FreeRTOS budget (test
    // harness formatting, debug builds).
    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb.max(64) * 1024)
        .spawn(f)
}
