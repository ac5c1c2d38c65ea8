use std::time::{Duration, Instant};

/// Monotonic time source consulted by time-gated repaints.
///
/// The draw pools never read the system time directly so tests can drive
/// refresh timers deterministically.
pub trait Clock {
    /// Time elapsed since the clock started.
    fn elapsed(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Restartable stopwatch measured against a [`Clock`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    started_at: Duration,
}

impl Timer {
    /// Start a timer at the clock's current time.
    pub fn started(clock: &dyn Clock) -> Self {
        Self {
            started_at: clock.elapsed(),
        }
    }

    pub fn restart(&mut self, clock: &dyn Clock) {
        self.started_at = clock.elapsed();
    }

    /// Time since the last (re)start. Saturates at zero if the clock went backwards.
    pub fn ticks_elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.elapsed().saturating_sub(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct StepClock(Cell<Duration>);

    impl Clock for StepClock {
        fn elapsed(&self) -> Duration {
            self.0.get()
        }
    }

    #[test]
    fn test_timer_measures_from_restart() {
        let clock = StepClock(Cell::new(Duration::from_millis(100)));
        let mut timer = Timer::started(&clock);

        clock.0.set(Duration::from_millis(150));
        assert_eq!(timer.ticks_elapsed(&clock), Duration::from_millis(50));

        timer.restart(&clock);
        assert_eq!(timer.ticks_elapsed(&clock), Duration::ZERO);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(second >= first);
    }
}
