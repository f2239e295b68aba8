use super::RawHandle;

/// The readiness a connection wants to be woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    pub const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };

    pub const BOTH: Interest = Interest {
        read: true,
        write: true,
    };
}

impl Default for Interest {
    fn default() -> Self {
        Interest::READABLE
    }
}

/// Readiness reported for one watched handle.
///
/// Error and hang-up conditions also mark the handle readable, so a
/// connection that only reads still gets to observe them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,

    /// The handle reported an error, hang-up, or is not open.
    pub error: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.readable || self.writable || self.error
    }
}

/// One handle the selector is asked to wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watch {
    pub handle: RawHandle,
    pub interest: Interest,
}
