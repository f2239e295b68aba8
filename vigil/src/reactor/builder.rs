use super::core::Reactor;
use super::poller::{DefaultSelector, Selector};

use std::time::Duration;

/// Builder for configuring and creating a [`Reactor`].
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = ReactorBuilder::new()
///     .poll_interval(Duration::from_millis(50))
///     .show_nonfatal_errors(false)
///     .build();
/// ```
pub struct ReactorBuilder {
    /// Idle poll interval. `None` blocks until I/O or a timer is due.
    poll_interval: Option<Duration>,

    /// Whether the default non-fatal diagnostic is emitted.
    show_nonfatal_errors: bool,

    /// Readiness back-end; the platform default when unset.
    selector: Option<Box<dyn Selector>>,
}

impl ReactorBuilder {
    /// Creates a builder with the default configuration.
    ///
    /// By default the reactor has no idle poll interval, shows non-fatal
    /// diagnostics, and waits with the platform [`DefaultSelector`].
    pub fn new() -> Self {
        Self {
            poll_interval: None,
            show_nonfatal_errors: true,
            selector: None,
        }
    }

    /// Sets the idle poll interval.
    ///
    /// Accepts a [`Duration`] or an `Option<Duration>`; zero polls
    /// continuously.
    pub fn poll_interval(mut self, interval: impl Into<Option<Duration>>) -> Self {
        self.poll_interval = interval.into();
        self
    }

    pub fn show_nonfatal_errors(mut self, show: bool) -> Self {
        self.show_nonfatal_errors = show;
        self
    }

    /// Replaces the readiness back-end.
    pub fn selector<S: Selector + 'static>(mut self, selector: S) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn build(self) -> Reactor {
        let selector = self
            .selector
            .unwrap_or_else(|| Box::new(DefaultSelector::new()));

        Reactor::from_parts(selector, self.poll_interval, self.show_nonfatal_errors)
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
