use super::{Handler, Timer, deadline_after};
use crate::reactor::{ReactorHandle, Token};

use std::fmt;
use std::time::{Duration, Instant};

/// A timer that fires once.
///
/// When its deadline is reached the handler runs and the timer asks the
/// reactor it was registered with to deregister it. A fired timer never
/// runs its handler again, even if it is polled before the removal is
/// applied.
pub struct OneShotTimer {
    deadline: Instant,
    handler: Handler,
    fired: bool,

    /// Set by [`Timer::bind`] on registration.
    binding: Option<(ReactorHandle, Token)>,
}

impl OneShotTimer {
    /// Creates a timer that fires `delay` from now.
    ///
    /// A delay too large to represent places the deadline in the far future.
    pub fn new<F>(delay: Duration, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self::at(deadline_after(Instant::now(), delay), handler)
    }

    /// Creates a timer that fires at `deadline`.
    pub fn at<F>(deadline: Instant, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self {
            deadline,
            handler: Box::new(handler),
            fired: false,
            binding: None,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl Timer for OneShotTimer {
    fn poll(&mut self, now: Instant) -> bool {
        if self.fired || now < self.deadline {
            return false;
        }

        self.fired = true;
        (self.handler)();

        if let Some((reactor, token)) = self.binding.take() {
            if let Err(e) = reactor.remove(token) {
                log::debug!("one-shot {token} already deregistered: {e}");
            }
        }

        true
    }

    fn next_activation(&self) -> Option<Instant> {
        (!self.fired).then_some(self.deadline)
    }

    fn bind(&mut self, reactor: &ReactorHandle, token: Token) {
        self.binding = Some((reactor.clone(), token));
    }
}

impl fmt::Debug for OneShotTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotTimer")
            .field("deadline", &self.deadline)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}
