//! Status engine lifecycle against a recording output.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hivewarden::Error;
use hivewarden::adapters::time::ManualClock;
use hivewarden::config::StatusConfig;
use hivewarden::status::patterns::{COLOUR_GREEN, COLOUR_OFF, COLOUR_RED, COLOUR_WHITE};
use hivewarden::status::{StatusEngine, StatusId, Summary};

use crate::mock_hw::{MockLed, OutputCall, StallingClock, wait_until};

const SETTLE: Duration = Duration::from_secs(2);

fn fast_engine() -> (StatusEngine<MockLed, ManualClock>, MockLed, ManualClock) {
    let led = MockLed::new();
    let clock = ManualClock::new(0);
    let cfg = StatusConfig {
        tick_ms: 5,
        flash_ms: 200,
    };
    (StatusEngine::new(led.clone(), clock.clone(), cfg), led, clock)
}

#[test]
fn render_loop_drives_the_output() {
    let (engine, led, _) = fast_engine();
    engine.init().unwrap();
    assert_eq!(led.calls().first(), Some(&OutputCall::InitPins));

    engine.set_state(StatusId::Armed);
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_GREEN)));
    assert_eq!(engine.current_colour(), COLOUR_GREEN);

    let before = led.colour_writes();
    assert!(wait_until(SETTLE, || led.colour_writes() > before + 3));
    engine.cleanup();
}

#[test]
fn detection_flash_overrides_then_reverts() {
    let (engine, led, clock) = fast_engine();
    engine.init().unwrap();
    engine.set_state(StatusId::Armed);
    engine.flash_detection();

    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_WHITE)));
    assert_eq!(engine.get_state(), StatusId::Detection);

    clock.advance_ms(200);
    assert_eq!(engine.get_state(), StatusId::Armed);
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_GREEN)));
    engine.cleanup();
}

#[test]
fn error_blink_follows_the_clock() {
    let (engine, led, clock) = fast_engine();
    engine.init().unwrap();
    engine.set_state(StatusId::Error);
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_RED)));

    clock.advance_ms(500);
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_OFF)));
    clock.advance_ms(500);
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_RED)));
    engine.cleanup();
}

#[test]
fn cleanup_forces_off_and_releases_pins() {
    let (engine, led, _) = fast_engine();
    engine.init().unwrap();
    engine.set_state(StatusId::Armed);
    assert!(wait_until(SETTLE, || led.saw_colour(COLOUR_GREEN)));

    engine.cleanup();
    let calls = led.calls();
    assert_eq!(calls.last(), Some(&OutputCall::Cleanup));
    assert_eq!(calls[calls.len() - 2], OutputCall::SetColor(COLOUR_OFF));
    assert_eq!(engine.active_summary(), Summary::NotInitialized);

    // No further writes once stopped.
    let writes = led.colour_writes();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(led.colour_writes(), writes);
}

#[test]
fn reinit_reconfigures_pins() {
    let (engine, led, _) = fast_engine();
    engine.init().unwrap();
    engine.cleanup();
    engine.init().unwrap();
    assert_eq!(led.count(OutputCall::InitPins), 2);
    assert!(engine.is_initialized());
    engine.cleanup();
    assert_eq!(led.count(OutputCall::Cleanup), 2);
}

#[test]
fn output_init_failure_propagates() {
    let engine = StatusEngine::new(
        MockLed::broken(),
        ManualClock::new(0),
        StatusConfig::default(),
    );
    assert_eq!(engine.init(), Err(Error::Output("mock led")));
    assert!(!engine.is_initialized());
    engine.set_state(StatusId::Armed);
    assert!(!engine.is_state_active(StatusId::Armed));
}

#[test]
fn concurrent_callers_never_see_partial_updates() {
    let (engine, _, _) = fast_engine();
    let engine = Arc::new(engine);
    engine.init().unwrap();

    let workers: Vec<_> = [StatusId::Offline, StatusId::CameraFail, StatusId::AuthFailed]
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..500 {
                    engine.set_state(id);
                    assert!(engine.is_state_active(id));
                    engine.clear_state(id);
                }
                engine.set_state(id);
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(engine.active_summary().to_string(), "OFFLINE,AUTH_FAILED,CAMERA_FAIL");
    assert_eq!(engine.get_state(), StatusId::CameraFail);
    engine.cleanup();
}

#[test]
fn dropping_a_running_engine_turns_the_led_off() {
    let (engine, led, _) = fast_engine();
    engine.init().unwrap();
    engine.set_state(StatusId::Armed);
    assert!(wait_until(SETTLE, || led.saw_colour(COLOUR_GREEN)));
    drop(engine);
    assert_eq!(led.last_colour(), Some(COLOUR_OFF));
    assert_eq!(led.calls().last(), Some(&OutputCall::Cleanup));
}

#[test]
fn detached_render_loop_does_not_outlive_its_session() {
    let led = MockLed::new();
    let clock = Arc::new(StallingClock::default());
    let cfg = StatusConfig {
        tick_ms: 5,
        flash_ms: 200,
    };
    let engine = StatusEngine::new(led.clone(), Arc::clone(&clock), cfg);

    engine.init().unwrap();
    clock.arm();
    assert!(wait_until(SETTLE, || clock.stalled().is_some()));
    let wedged = clock.stalled().unwrap();

    // The wedged loop misses the bounded join and is detached.
    engine.cleanup();
    engine.init().unwrap();
    engine.set_state(StatusId::Armed);
    clock.release();
    assert!(wait_until(SETTLE, || led.last_colour() == Some(COLOUR_GREEN)));

    thread::sleep(Duration::from_millis(50));
    clock.take_renderers();
    thread::sleep(Duration::from_millis(100));
    let renderers = clock.take_renderers();
    assert_eq!(renderers.len(), 1);
    assert!(!renderers.contains(&wedged));
    assert_eq!(led.last_colour(), Some(COLOUR_GREEN));

    engine.cleanup();
}
