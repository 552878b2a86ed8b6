use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

/// Time source for every wait in a recovery cycle
pub trait Clock {
    /// Milliseconds since the clock was created
    fn now_ms(&self) -> u64;

    /// Block for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time; sleeps the current thread
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time that only moves when slept on or advanced; records every sleep
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration.as_millis() as u64);
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.borrow_mut().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_millis(200));
        clock.advance(Duration::from_millis(50));
        clock.sleep(Duration::from_secs(1));

        assert_eq!(clock.now_ms(), 1250);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(200), Duration::from_secs(1)]);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now_ms() >= first + 5);
    }
}
