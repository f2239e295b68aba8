use super::handle::ReactorHandle;
use super::poller::{self, Interest, RawHandle, Readiness};
use crate::error::{Error, PollError, Result};
use crate::timer::Timer;

use std::fmt;

/// A network endpoint the reactor waits on.
///
/// The reactor waits on [`handle`](Connection::handle) for the readiness
/// described by [`interest`](Connection::interest), and calls
/// [`poll`](Connection::poll) whenever the handle is ready.
///
/// A connection may classify a failure as recoverable by returning
/// [`PollError::Nonfatal`]; it is reported through the reactor's
/// non-fatal hook and the loop carries on. Any other error ends the loop.
pub trait Connection {
    /// The wait-handle of this connection.
    fn handle(&self) -> RawHandle;

    /// Readiness to wait for. Re-read on every loop iteration.
    fn interest(&self) -> Interest {
        Interest::READABLE
    }

    /// Services the connection after its handle became ready.
    fn poll(&mut self, ready: Readiness, reactor: &ReactorHandle) -> Result<(), PollError>;
}

/// What a [`Token`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Connection,
    Timer,
}

/// Identifies one registration on a reactor.
///
/// Tokens are never reused by the reactor that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    id: u64,
    kind: Kind,
}

impl Token {
    pub(crate) fn new(id: u64, kind: Kind) -> Self {
        Self { id, kind }
    }

    pub(crate) fn id(self) -> u64 {
        self.id
    }

    pub fn kind(self) -> Kind {
        self.kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Connection => write!(f, "connection#{}", self.id),
            Kind::Timer => write!(f, "timer#{}", self.id),
        }
    }
}

/// An item that can be registered with a reactor.
pub enum Registrant {
    Connection(Box<dyn Connection>),
    Timer(Box<dyn Timer>),
}

impl Registrant {
    pub fn connection<C: Connection + 'static>(connection: C) -> Self {
        Registrant::Connection(Box::new(connection))
    }

    pub fn timer<T: Timer + 'static>(timer: T) -> Self {
        Registrant::Timer(Box::new(timer))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Registrant::Connection(_) => Kind::Connection,
            Registrant::Timer(_) => Kind::Timer,
        }
    }

    pub fn into_connection(self) -> Option<Box<dyn Connection>> {
        match self {
            Registrant::Connection(connection) => Some(connection),
            Registrant::Timer(_) => None,
        }
    }

    pub fn into_timer(self) -> Option<Box<dyn Timer>> {
        match self {
            Registrant::Timer(timer) => Some(timer),
            Registrant::Connection(_) => None,
        }
    }

    /// Checks that the registrant can be waited on.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Registrant::Connection(connection) => {
                let handle = connection.handle();
                if !poller::is_valid_handle(handle) {
                    return Err(Error::InvalidRegistrant(format!(
                        "connection wait-handle {handle} is not an open descriptor"
                    )));
                }
                Ok(())
            }
            Registrant::Timer(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Registrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registrant::Connection(connection) => f
                .debug_tuple("Connection")
                .field(&connection.handle())
                .finish(),
            Registrant::Timer(timer) => f
                .debug_tuple("Timer")
                .field(&timer.next_activation())
                .finish(),
        }
    }
}
