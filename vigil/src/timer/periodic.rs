use super::{Handler, Timer, deadline_after};

use std::fmt;
use std::time::{Duration, Instant};

/// A timer that fires at a fixed period.
///
/// When polled late the timer fires **once** and then advances its
/// deadline by as many whole periods as needed to put it back in the
/// future; missed activations are not replayed.
///
/// A zero period fires on every loop iteration.
pub struct PeriodicTimer {
    period: Duration,
    deadline: Instant,
    handler: Handler,
}

impl PeriodicTimer {
    /// Creates a timer whose first activation is one period from now.
    pub fn new<F>(period: Duration, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self::starting_at(deadline_after(Instant::now(), period), period, handler)
    }

    /// Creates a timer whose first activation is at `first`.
    pub fn starting_at<F>(first: Instant, period: Duration, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self {
            period,
            deadline: first,
            handler: Box::new(handler),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Timer for PeriodicTimer {
    fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }

        (self.handler)();
        self.deadline = catch_up(self.deadline, self.period, now);

        true
    }

    fn next_activation(&self) -> Option<Instant> {
        Some(self.deadline)
    }
}

impl fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("period", &self.period)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Returns the first `deadline + k * period` strictly after `now`.
///
/// Requires `now >= deadline`. A zero period yields `now`.
fn catch_up(deadline: Instant, period: Duration, now: Instant) -> Instant {
    if period.is_zero() {
        return now;
    }

    let behind = now.duration_since(deadline).as_nanos();
    let periods = behind / period.as_nanos() + 1;
    let advance = period.as_nanos().saturating_mul(periods);
    let advance = Duration::from_nanos(u64::try_from(advance).unwrap_or(u64::MAX));

    deadline
        .checked_add(advance)
        .unwrap_or_else(|| deadline_after(now, period))
}
