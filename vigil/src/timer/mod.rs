//! Timer primitives.
//!
//! A timer is anything the reactor can ask "are you due?" once per loop
//! iteration. The reactor keeps the minimum of all timers'
//! [`next_activation`](Timer::next_activation) values and uses it to bound
//! its readiness wait.
//!
//! Two concrete forms are provided:
//! - [`OneShotTimer`] fires once and then deregisters itself,
//! - [`PeriodicTimer`] fires at a fixed period with catch-up semantics.
//!
//! Deadlines are monotonic [`Instant`]s; wall-clock adjustments do not
//! affect them.

mod oneshot;
mod periodic;

pub use oneshot::OneShotTimer;
pub use periodic::PeriodicTimer;

use crate::reactor::{ReactorHandle, Token};

use std::time::{Duration, Instant};

/// A timer that can be registered with a [`Reactor`](crate::Reactor).
///
/// The provided method bodies describe a timer that never activates.
pub trait Timer {
    /// Activates the timer if `now` has reached its deadline.
    ///
    /// Returns `true` if the time of next activation changed.
    fn poll(&mut self, now: Instant) -> bool {
        let _ = now;
        false
    }

    /// The time of next activation, or `None` if the timer will not fire again.
    fn next_activation(&self) -> Option<Instant>;

    /// Called once when the timer is registered.
    ///
    /// `token` identifies this timer's registration on `reactor`.
    fn bind(&mut self, reactor: &ReactorHandle, token: Token) {
        let _ = (reactor, token);
    }
}

/// Handler invoked when a timer activates.
pub(crate) type Handler = Box<dyn FnMut()>;

/// Roughly 30 years; stands in for deadlines that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `at + delay`, saturating to a far-future deadline on overflow.
pub(crate) fn deadline_after(at: Instant, delay: Duration) -> Instant {
    at.checked_add(delay)
        .or_else(|| at.checked_add(FAR_FUTURE))
        .unwrap_or(at)
}
