use super::registrant::Token;
use crate::error::NonfatalError;
use crate::event::{Observable, TraceArgs, TraceFields};

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A recoverable connection failure, as delivered to the non-fatal hook.
#[derive(Debug)]
pub struct NonfatalReport {
    token: Token,
    error: NonfatalError,
}

impl NonfatalReport {
    pub(crate) fn new(token: Token, error: NonfatalError) -> Self {
        Self { token, error }
    }

    /// The connection whose poll failed.
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn error(&self) -> &NonfatalError {
        &self.error
    }

    pub fn kind(&self) -> &str {
        self.error.kind()
    }
}

impl fmt::Display for NonfatalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*** {} : {}", self.error.kind(), self.error)
    }
}

impl TraceArgs for NonfatalReport {
    fn trace_fields(&self, fields: &mut TraceFields) {
        fields.push_positional(1, &self.error);
        fields.push("token", self.token);
        fields.push("kind", self.error.kind());
        fields.push("message", &self.error);
    }
}

/// The reactor's lifecycle hooks.
///
/// Built once per reactor. The default non-fatal diagnostic is not an
/// observer: it runs after `on_nonfatal_error` unless an observer broke out
/// of the dispatch, and only while `show` is set.
pub(crate) struct Hooks {
    /// Fired at the end of every loop iteration.
    pub(crate) on_poll: Observable<()>,

    /// Fired when a connection reports a non-fatal failure.
    pub(crate) on_nonfatal_error: Observable<NonfatalReport>,

    show: Rc<Cell<bool>>,
}

impl Hooks {
    pub(crate) fn new(show: Rc<Cell<bool>>) -> Self {
        Self {
            on_poll: Observable::new(),
            on_nonfatal_error: Observable::new(),
            show,
        }
    }

    /// Dispatches `report`, then emits the default diagnostic if no
    /// observer short-circuited.
    pub(crate) fn report_nonfatal(&self, report: &NonfatalReport) {
        if self.on_nonfatal_error.trigger(report).is_none() && self.show.get() {
            log::warn!("{report}");
        }
    }

    /// Drops every observer.
    pub(crate) fn clear(&self) {
        self.on_poll.clear();
        self.on_nonfatal_error.clear();
    }
}
