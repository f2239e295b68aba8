//! Readiness selection.
//!
//! The reactor blocks in exactly one place: [`Selector::select`]. The
//! platform back-end is chosen at compile time and exposed as
//! [`DefaultSelector`]:
//! - `poll(2)` on Unix targets,
//! - `WSAPoll` on Windows.
//!
//! Any other [`Selector`] can be installed through
//! [`ReactorBuilder::selector`](crate::ReactorBuilder::selector), which is
//! how tests drive the loop without sockets.

mod common;

pub use common::{Interest, Readiness, Watch};

use std::io;
use std::time::Duration;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod wsapoll;

#[cfg(unix)]
pub use unix::PollSelector as DefaultSelector;

#[cfg(windows)]
pub use wsapoll::WsaPollSelector as DefaultSelector;

/// The OS handle a connection is waited on by.
#[cfg(unix)]
pub type RawHandle = std::os::fd::RawFd;

/// The OS handle a connection is waited on by.
#[cfg(windows)]
pub type RawHandle = std::os::windows::io::RawSocket;

/// A readiness multiplexer.
pub trait Selector {
    /// Waits until at least one watch is ready or `timeout` elapses.
    ///
    /// `None` waits indefinitely. On return `ready` holds the index into
    /// `watches` and the readiness of every ready handle; it is cleared
    /// first. An interrupted wait returns `Ok` with nothing ready.
    fn select(
        &mut self,
        watches: &[Watch],
        timeout: Option<Duration>,
        ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()>;
}

impl<S: Selector + ?Sized> Selector for Box<S> {
    fn select(
        &mut self,
        watches: &[Watch],
        timeout: Option<Duration>,
        ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()> {
        (**self).select(watches, timeout, ready)
    }
}

/// Returns the raw handle of an I/O object.
#[cfg(unix)]
pub fn raw_handle<T: std::os::fd::AsRawFd>(io: &T) -> RawHandle {
    io.as_raw_fd()
}

/// Returns the raw handle of an I/O object.
#[cfg(windows)]
pub fn raw_handle<T: std::os::windows::io::AsRawSocket>(io: &T) -> RawHandle {
    io.as_raw_socket()
}

#[cfg(unix)]
pub(crate) fn is_valid_handle(handle: RawHandle) -> bool {
    handle >= 0
}

#[cfg(windows)]
pub(crate) fn is_valid_handle(handle: RawHandle) -> bool {
    handle != windows_sys::Win32::Networking::WinSock::INVALID_SOCKET as RawHandle
}

/// Converts a wait timeout to the millisecond argument of `poll`-style calls.
///
/// Sub-millisecond remainders round up so that a short wait does not
/// degrade into a busy loop. `None` maps to `-1` (infinite).
pub(crate) fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => {
            let millis = t.as_nanos().div_ceil(1_000_000);
            millis.min(i32::MAX as u128) as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::timeout_millis;
    use std::time::Duration;

    #[test]
    fn timeout_rounds_up_to_milliseconds() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(300))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(100))), 100);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }
}
