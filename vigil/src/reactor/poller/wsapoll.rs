//! `WSAPoll`-based selector for Windows targets.
//!
//! Only sockets can be watched. `WSAPoll` rejects an empty descriptor
//! array, so a wait with nothing to watch sleeps for the timeout instead.

use super::{Interest, Readiness, Selector, Watch, timeout_millis};

use std::io;
use std::mem;
use std::sync::Once;
use std::thread;
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock::{
    POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, SOCKET, SOCKET_ERROR, WSADATA, WSAPOLLFD,
    WSAPoll, WSAStartup,
};

static WINSOCK_INIT: Once = Once::new();

/// Initializes Winsock 2.2 once per process.
fn ensure_winsock() {
    WINSOCK_INIT.call_once(|| unsafe {
        let mut data: WSADATA = mem::zeroed();
        let rc = WSAStartup(0x0202, &mut data);
        if rc != 0 {
            log::error!("WSAStartup failed with code {rc}");
        }
    });
}

/// Selector backed by `WSAPoll`.
#[derive(Default)]
pub struct WsaPollSelector {
    fds: Vec<WSAPOLLFD>,
}

impl WsaPollSelector {
    pub fn new() -> Self {
        Self {
            fds: Vec::with_capacity(64),
        }
    }
}

fn events_for(interest: Interest) -> i16 {
    let mut events = 0;

    if interest.read {
        events |= POLLIN as i16;
    }
    if interest.write {
        events |= POLLOUT as i16;
    }

    events
}

impl Selector for WsaPollSelector {
    fn select(
        &mut self,
        watches: &[Watch],
        timeout: Option<Duration>,
        ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()> {
        ready.clear();

        if watches.is_empty() {
            thread::sleep(timeout.unwrap_or(Duration::MAX));
            return Ok(());
        }

        ensure_winsock();

        self.fds.clear();
        self.fds.extend(watches.iter().map(|watch| WSAPOLLFD {
            fd: watch.handle as SOCKET,
            events: events_for(watch.interest),
            revents: 0,
        }));

        let rc = unsafe {
            WSAPoll(
                self.fds.as_mut_ptr(),
                self.fds.len() as u32,
                timeout_millis(timeout),
            )
        };

        if rc == SOCKET_ERROR {
            return Err(io::Error::last_os_error());
        }

        let error_mask = (POLLERR | POLLHUP | POLLNVAL) as i16;

        for (index, fd) in self.fds.iter().enumerate() {
            let revents = fd.revents as i16;
            if revents == 0 {
                continue;
            }

            let error = revents & error_mask != 0;

            ready.push((
                index,
                Readiness {
                    readable: revents & POLLIN as i16 != 0 || error,
                    writable: revents & POLLOUT as i16 != 0,
                    error,
                },
            ));
        }

        Ok(())
    }
}
