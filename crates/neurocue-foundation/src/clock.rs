//! # Clock Abstraction for Test Determinism
//!
//! Sample and marker timestamps live in one shared monotonic-seconds space.
//! The `Clock` trait provides both that space (`now_secs`) and `Instant`-based
//! deadlines, with a virtual implementation so time-dependent logic (grace
//! periods, polling waits) can be tested deterministically.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Current point in time for deadline arithmetic.
    fn now(&self) -> Instant;

    /// Seconds since this clock's origin, the timestamp space all samples
    /// and markers are compared in.
    fn now_secs(&self) -> f64;

    /// Sleep for the specified duration.
    fn sleep(&self, duration: Duration);
}

/// Real-time clock. The origin is fixed at construction so `now_secs` is
/// monotonic for the lifetime of the process.
pub struct RealClock {
    origin: Instant,
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for deterministic testing. `sleep` advances virtual time
/// instead of blocking.
pub struct TestClock {
    origin: Instant,
    current: Mutex<Instant>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            current: Mutex::new(origin),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.current.lock().unwrap();
        *now += duration;
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }

    fn now_secs(&self) -> f64 {
        self.now().duration_since(self.origin).as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        std::thread::yield_now();
    }
}

/// Thread-safe clock that can be shared across threads.
pub type SharedClock = std::sync::Arc<dyn Clock + Send + Sync>;

pub fn real_clock() -> SharedClock {
    std::sync::Arc::new(RealClock::new())
}

pub fn test_clock() -> std::sync::Arc<TestClock> {
    std::sync::Arc::new(TestClock::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_clock_secs_monotonic() {
        let clock = RealClock::new();
        let a = clock.now_secs();
        let b = clock.now_secs();
        assert!(b >= a);
    }

    #[test]
    fn test_clock_advances_virtually() {
        let clock = TestClock::new();
        let t0 = clock.now_secs();
        clock.advance_secs(2.5);
        let t1 = clock.now_secs();
        assert!((t1 - t0 - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_clock_sleep_is_virtual() {
        let clock = TestClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(60));
        assert_eq!(clock.now().duration_since(before), Duration::from_secs(60));
    }
}
