//! Request pacing for the upstream geocoder.
//!
//! The public Nominatim usage policy allows at most one request per second.
//! A `RequestThrottle` remembers when the last request went out and sleeps
//! away the remainder of the interval before the next one.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Hard floor between two upstream requests.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);

/// Time source, injectable so tests never really sleep.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually advanced clock. `sleep` advances time instantly and records the
/// requested duration.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
    slept: Cell<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Cell::new(Instant::now()),
            slept: Cell::new(Duration::ZERO),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Total time spent in `sleep`.
    pub fn total_slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Enforces a minimum spacing between requests.
#[derive(Debug)]
pub struct RequestThrottle<C: Clock = SystemClock> {
    clock: C,
    interval: Duration,
    last_request: Option<Instant>,
}

impl RequestThrottle<SystemClock> {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(SystemClock, interval)
    }
}

impl<C: Clock> RequestThrottle<C> {
    /// Intervals shorter than the policy floor are raised to it.
    pub fn with_clock(clock: C, interval: Duration) -> Self {
        Self {
            clock,
            interval: interval.max(MIN_REQUEST_INTERVAL),
            last_request: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// How long a request issued now would have to wait.
    pub fn remaining(&self) -> Duration {
        match self.last_request {
            Some(last) => self
                .interval
                .saturating_sub(self.clock.now().saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Block until a request may be issued, then mark it as issued.
    pub fn acquire(&mut self) {
        self.pace();
        self.last_request = Some(self.clock.now());
    }

    /// Block until the interval since the last request has elapsed,
    /// without claiming a slot.
    pub fn pace(&self) {
        let wait = self.remaining();
        if !wait.is_zero() {
            log::debug!("Throttling geocoder for {} ms", wait.as_millis());
            self.clock.sleep(wait);
        }
    }

    /// Sleep one full interval unconditionally.
    pub fn pause(&self) {
        self.clock.sleep(self.interval);
    }

    /// Sleep an extra amount (retry jitter) on top of regular pacing.
    pub fn sleep_extra(&self, duration: Duration) {
        if !duration.is_zero() {
            self.clock.sleep(duration);
        }
    }
}
