//! Rate limiter as the auth handler uses it.

use std::sync::{Arc, Mutex};
use std::thread;

use hivewarden::adapters::time::ManualClock;
use hivewarden::auth::RateLimiter;
use hivewarden::auth::rate_limit::CAPACITY;
use hivewarden::config::RateLimitConfig;

fn limiter() -> (RateLimiter<ManualClock>, ManualClock) {
    let clock = ManualClock::new(10_000);
    (RateLimiter::new(RateLimitConfig::default(), clock.clone()), clock)
}

/// What the login handler does per request.
fn attempt(rl: &mut RateLimiter<ManualClock>, ip: &str, password_ok: bool) -> Result<(), &'static str> {
    if rl.is_blocked(ip) {
        return Err("429");
    }
    if password_ok {
        rl.clear(ip);
        Ok(())
    } else {
        rl.record_failure(ip);
        Err("401")
    }
}

#[test]
fn brute_force_is_locked_out_then_released() {
    let (mut rl, clock) = limiter();
    let ip = "192.168.4.23";

    for _ in 0..5 {
        assert_eq!(attempt(&mut rl, ip, false), Err("401"));
    }
    // Even the right password is refused while blocked.
    assert_eq!(attempt(&mut rl, ip, true), Err("429"));

    clock.advance_secs(60);
    assert_eq!(attempt(&mut rl, ip, true), Ok(()));
    assert_eq!(rl.failure_count(ip), 0);
}

#[test]
fn other_clients_are_unaffected() {
    let (mut rl, _) = limiter();
    for _ in 0..5 {
        rl.record_failure("192.168.4.23");
    }
    assert!(rl.is_blocked("192.168.4.23"));
    assert_eq!(attempt(&mut rl, "192.168.4.24", true), Ok(()));
}

#[test]
fn key_churn_never_grows_the_table() {
    let (mut rl, clock) = limiter();
    for i in 0..200u32 {
        rl.record_failure(&format!("10.{}.{}.{}", i / 65_536, (i / 256) % 256, i % 256));
        clock.advance_ms(100);
        assert!(rl.len() <= CAPACITY);
    }
    assert_eq!(rl.len(), CAPACITY);
}

#[test]
fn seventeenth_key_evicts_the_first() {
    let (mut rl, clock) = limiter();
    for i in 0..=CAPACITY {
        rl.record_failure(&format!("172.16.0.{i}"));
        clock.advance_ms(1);
    }
    assert_eq!(rl.len(), CAPACITY);
    assert_eq!(rl.failure_count("172.16.0.0"), 0);
    for i in 1..=CAPACITY {
        assert_eq!(rl.failure_count(&format!("172.16.0.{i}")), 1);
    }
}

#[test]
fn external_mutex_makes_it_shareable() {
    let (rl, _) = limiter();
    let rl = Arc::new(Mutex::new(rl));

    let handlers: Vec<_> = (0..4)
        .map(|_| {
            let rl = Arc::clone(&rl);
            thread::spawn(move || {
                for _ in 0..10 {
                    rl.lock().unwrap().record_failure("192.168.4.50");
                }
            })
        })
        .collect();
    for h in handlers {
        h.join().unwrap();
    }

    let mut rl = rl.lock().unwrap();
    assert_eq!(rl.failure_count("192.168.4.50"), 40);
    assert!(rl.is_blocked("192.168.4.50"));
}
