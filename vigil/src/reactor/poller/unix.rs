//! `poll(2)`-based selector for Unix targets.

use super::{Interest, Readiness, Selector, Watch, timeout_millis};

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, nfds_t, poll, pollfd};
use std::io;
use std::time::Duration;

/// Selector backed by `poll(2)`.
///
/// The `pollfd` array is rebuilt from the watch list on every call and its
/// allocation is reused across calls.
#[derive(Default)]
pub struct PollSelector {
    fds: Vec<pollfd>,
}

impl PollSelector {
    pub fn new() -> Self {
        Self {
            fds: Vec::with_capacity(64),
        }
    }
}

fn events_for(interest: Interest) -> i16 {
    let mut events = 0;

    if interest.read {
        events |= POLLIN;
    }
    if interest.write {
        events |= POLLOUT;
    }

    events
}

impl Selector for PollSelector {
    fn select(
        &mut self,
        watches: &[Watch],
        timeout: Option<Duration>,
        ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()> {
        ready.clear();

        self.fds.clear();
        self.fds.extend(watches.iter().map(|watch| pollfd {
            fd: watch.handle,
            events: events_for(watch.interest),
            revents: 0,
        }));

        let n = unsafe {
            poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as nfds_t,
                timeout_millis(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for (index, fd) in self.fds.iter().enumerate() {
            let revents = fd.revents;
            if revents == 0 {
                continue;
            }

            let error = revents & (POLLERR | POLLHUP | POLLNVAL) != 0;

            ready.push((
                index,
                Readiness {
                    readable: revents & POLLIN != 0 || error,
                    writable: revents & POLLOUT != 0,
                    error,
                },
            ));
        }

        Ok(())
    }
}
