//! Error types.
//!
//! Failures fall into three tiers:
//! - **per-connection recoverable** failures, classified by the connection
//!   as [`PollError::Nonfatal`], reported through the reactor's non-fatal
//!   hook while the loop keeps running;
//! - **loop-fatal** failures ([`Error::ConnectionLost`] when the wait
//!   primitive itself fails, [`Error::Connection`] for an unclassified
//!   connection failure), which terminate [`Reactor::run`](crate::Reactor::run);
//! - **contract** errors ([`Error::InvalidRegistrant`], [`Error::NotRegistered`],
//!   [`Error::UnknownObserver`]), returned synchronously at the call site.

use crate::event::ObserverId;
use crate::reactor::Token;

use std::any::{self, Any};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// A boxed, single-threaded error.
pub type BoxError = Box<dyn StdError + 'static>;

/// Convenience alias for results produced by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the reactor and by observables.
#[derive(Debug, Error)]
pub enum Error {
    /// The multiplexing wait itself failed; the loop cannot continue.
    #[error("connection lost: the readiness wait failed")]
    ConnectionLost(#[source] io::Error),

    /// A connection failed with an unclassified error while being polled.
    #[error("{token} failed while being polled")]
    Connection {
        token: Token,
        #[source]
        source: BoxError,
    },

    /// The item handed to the reactor cannot be registered.
    #[error("invalid registrant: {0}")]
    InvalidRegistrant(String),

    /// The token does not name a live registration.
    #[error("{0} is not registered with this reactor")]
    NotRegistered(Token),

    /// The observer id does not name a live observer.
    #[error("{0} is not registered with this observable")]
    UnknownObserver(ObserverId),
}

/// A failure classified as recoverable by the connection that raised it.
///
/// Besides the error itself, a `NonfatalError` records a failure kind, which
/// the default diagnostic prints alongside the message: the
/// [`io::ErrorKind`] for I/O errors, the short type name of the source
/// otherwise.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct NonfatalError {
    kind: Cow<'static, str>,
    #[source]
    source: BoxError,
}

impl NonfatalError {
    /// Wraps an error, recording its failure kind.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        let kind = match (&error as &dyn Any).downcast_ref::<io::Error>() {
            Some(e) => Cow::Owned(format!("{:?}", e.kind())),
            None => Cow::Borrowed(short_type_name::<E>()),
        };

        Self {
            kind,
            source: Box::new(error),
        }
    }

    /// Builds a non-fatal error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();

        Self {
            kind: Cow::Borrowed("NonfatalError"),
            source: message.into(),
        }
    }

    /// The failure kind of the underlying error.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// The outcome of a failed [`Connection::poll`](crate::Connection::poll).
#[derive(Debug, Error)]
pub enum PollError {
    /// Reported through the non-fatal hook; the loop continues.
    #[error(transparent)]
    Nonfatal(#[from] NonfatalError),

    /// Unclassified; terminates the loop.
    #[error("{0}")]
    Fatal(BoxError),
}

impl PollError {
    /// Classifies `error` as recoverable.
    pub fn nonfatal<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        PollError::Nonfatal(NonfatalError::new(error))
    }

    /// Classifies `error` as fatal to the loop.
    pub fn fatal<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        PollError::Fatal(Box::new(error))
    }

    pub fn is_nonfatal(&self) -> bool {
        matches!(self, PollError::Nonfatal(_))
    }
}

impl From<io::Error> for PollError {
    /// I/O errors are unclassified and therefore fatal.
    fn from(error: io::Error) -> Self {
        PollError::Fatal(Box::new(error))
    }
}

/// Extension for classifying fallible results as recoverable.
///
/// ```rust,ignore
/// let n = self.stream.read(&mut buf).nonfatal()?;
/// ```
pub trait NonfatalExt<T> {
    fn nonfatal(self) -> std::result::Result<T, PollError>;
}

impl<T, E> NonfatalExt<T> for std::result::Result<T, E>
where
    E: StdError + 'static,
{
    fn nonfatal(self) -> std::result::Result<T, PollError> {
        self.map_err(PollError::nonfatal)
    }
}

/// Strips the module path and generic arguments from a type name.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
