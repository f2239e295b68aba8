use std::cell::{Cell, RefCell};
use std::io;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use vigil::{
    Connection, Error, Interest, NonfatalError, OneShotTimer, PeriodicTimer, PollError, RawHandle,
    Reactor, ReactorHandle, Readiness, Selector, Token, Watch,
};

/// Reports the watches at `ready` as readable on every call.
struct Scripted {
    ready: Vec<usize>,
    timeouts: Rc<RefCell<Vec<Option<Duration>>>>,
}

impl Scripted {
    fn ready(indices: &[usize]) -> Self {
        Self {
            ready: indices.to_vec(),
            timeouts: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Selector for Scripted {
    fn select(
        &mut self,
        watches: &[Watch],
        timeout: Option<Duration>,
        ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()> {
        ready.clear();
        self.timeouts.borrow_mut().push(timeout);

        for &index in self.ready.iter().filter(|&&i| i < watches.len()) {
            ready.push((
                index,
                Readiness {
                    readable: true,
                    ..Readiness::default()
                },
            ));
        }

        Ok(())
    }
}

struct Failing;

impl Selector for Failing {
    fn select(
        &mut self,
        _watches: &[Watch],
        _timeout: Option<Duration>,
        _ready: &mut Vec<(usize, Readiness)>,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(9))
    }
}

type PollFn = Box<dyn FnMut(&ReactorHandle) -> Result<(), PollError>>;

/// A connection whose poll behaviour is supplied by the test.
struct Probe {
    handle: RawHandle,
    on_ready: PollFn,
}

impl Probe {
    fn new<F>(on_ready: F) -> Self
    where
        F: FnMut(&ReactorHandle) -> Result<(), PollError> + 'static,
    {
        Self {
            handle: 0,
            on_ready: Box::new(on_ready),
        }
    }
}

impl Connection for Probe {
    fn handle(&self) -> RawHandle {
        self.handle
    }

    fn interest(&self) -> Interest {
        Interest::READABLE
    }

    fn poll(&mut self, _ready: Readiness, reactor: &ReactorHandle) -> Result<(), PollError> {
        (self.on_ready)(reactor)
    }
}

#[cfg(unix)]
const INVALID_HANDLE: RawHandle = -1;

#[cfg(windows)]
const INVALID_HANDLE: RawHandle = RawHandle::MAX;

fn log() -> Rc<RefCell<Vec<&'static str>>> {
    Rc::new(RefCell::new(Vec::new()))
}

/// Records every warning emitted while the suite runs.
struct Capture;

static CAPTURE: Capture = Capture;
static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

impl log::Log for Capture {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            WARNINGS
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn init_logger() {
    if log::set_logger(&CAPTURE).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

/// Warnings containing `needle`. Tests run in parallel, so each one
/// filters on a message of its own.
fn warnings_mentioning(needle: &str) -> Vec<String> {
    WARNINGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}

#[test]
fn test_timer_fires_then_on_poll_after_wait() {
    init_logger();

    let mut reactor = Reactor::new();
    let handle = reactor.handle();
    let order = log();
    let fired = Rc::new(Cell::new(false));

    {
        let order = order.clone();
        let fired = fired.clone();
        reactor
            .add_timer(OneShotTimer::new(Duration::from_millis(100), move || {
                order.borrow_mut().push("timer");
                fired.set(true);
            }))
            .unwrap();
    }
    {
        let order = order.clone();
        reactor.on_poll().observe(move |_| {
            order.borrow_mut().push("poll");
            if fired.get() {
                handle.stop();
            }
        });
    }

    let start = Instant::now();
    reactor.run().unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(95), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");

    let order = order.borrow();
    let timer_at = order.iter().position(|e| *e == "timer").unwrap();
    assert_eq!(order.iter().filter(|e| **e == "timer").count(), 1);
    assert_eq!(order.get(timer_at + 1), Some(&"poll"));
    assert_eq!(order.last(), Some(&"poll"));
}

#[test]
fn test_poll_interval_bounds_idle_wait() {
    let mut reactor = Reactor::builder()
        .poll_interval(Duration::from_millis(30))
        .build();
    let handle = reactor.handle();
    reactor.on_poll().observe(move |_| handle.stop());

    let start = Instant::now();
    reactor.run().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(reactor.poll_interval(), Some(Duration::from_millis(30)));
}

#[test]
fn test_wait_timeout_follows_interval_and_timers() {
    let selector = Scripted::ready(&[]);
    let timeouts = selector.timeouts.clone();
    let mut reactor = Reactor::builder().selector(selector).build();

    reactor.turn().unwrap();

    reactor.set_poll_interval(Some(Duration::from_secs(1)));
    reactor.turn().unwrap();

    reactor
        .add_timer(OneShotTimer::new(Duration::from_secs(30), || {}))
        .unwrap();
    reactor.turn().unwrap();

    reactor.set_poll_interval(None);
    reactor.turn().unwrap();

    let timeouts = timeouts.borrow();
    assert_eq!(timeouts[0], None);
    assert_eq!(timeouts[1], Some(Duration::from_secs(1)));
    assert_eq!(timeouts[2], Some(Duration::from_secs(1)));

    let until_timer = timeouts[3].unwrap();
    assert!(until_timer > Duration::from_secs(29) && until_timer <= Duration::from_secs(30));
}

#[test]
fn test_stop_in_on_poll_finishes_current_iteration() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[])).build();
    let handle = reactor.handle();
    let ticks = Rc::new(Cell::new(0));
    let polls = Rc::new(Cell::new(0));

    {
        let ticks = ticks.clone();
        reactor
            .add_timer(PeriodicTimer::new(Duration::ZERO, move || {
                ticks.set(ticks.get() + 1)
            }))
            .unwrap();
    }
    {
        let polls = polls.clone();
        reactor.on_poll().observe(move |_| {
            polls.set(polls.get() + 1);
            handle.stop();
        });
    }

    reactor.run().unwrap();

    assert_eq!(ticks.get(), 1, "timers are not re-polled after stop");
    assert_eq!(polls.get(), 1, "no further iteration starts");
    assert!(!reactor.is_running());
}

#[test]
fn test_phase_order_is_connections_timers_hook() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let handle = reactor.handle();
    let order = log();

    {
        let order = order.clone();
        reactor
            .add_connection(Probe::new(move |_| {
                order.borrow_mut().push("connection");
                Ok(())
            }))
            .unwrap();
    }
    {
        let order = order.clone();
        reactor
            .add_timer(PeriodicTimer::new(Duration::ZERO, move || {
                order.borrow_mut().push("timer")
            }))
            .unwrap();
    }
    {
        let order = order.clone();
        reactor.on_poll().observe(move |_| {
            order.borrow_mut().push("poll");
            handle.stop();
        });
    }

    reactor.run().unwrap();

    assert_eq!(*order.borrow(), vec!["connection", "timer", "poll"]);
}

#[test]
fn test_nonfatal_error_is_reported_and_loop_survives() {
    init_logger();

    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let handle = reactor.handle();
    let reports = Rc::new(RefCell::new(Vec::new()));
    let polls = Rc::new(Cell::new(0));

    let token = reactor
        .add_connection(Probe::new({
            let polls = polls.clone();
            move |_: &ReactorHandle| -> Result<(), PollError> {
                polls.set(polls.get() + 1);
                if polls.get() == 1 {
                    Err(NonfatalError::msg("bad packet").into())
                } else {
                    Ok(())
                }
            }
        }))
        .unwrap();

    {
        let reports = reports.clone();
        reactor.on_nonfatal_error().observe(move |report| {
            reports
                .borrow_mut()
                .push((report.token(), report.kind().to_owned(), report.error().to_string()));
        });
    }
    {
        let polls = polls.clone();
        reactor.on_poll().observe(move |_| {
            if polls.get() >= 3 {
                handle.stop();
            }
        });
    }

    reactor.run().unwrap();

    assert_eq!(polls.get(), 3);
    assert_eq!(
        *reports.borrow(),
        vec![(token, "NonfatalError".to_owned(), "bad packet".to_owned())]
    );
    assert_eq!(reactor.connection_count(), 1, "the connection stays registered");
}

#[test]
fn test_default_diagnostic_can_be_disabled() {
    let mut reactor = Reactor::builder()
        .selector(Scripted::ready(&[0]))
        .show_nonfatal_errors(false)
        .build();
    let handle = reactor.handle();

    reactor
        .add_connection(Probe::new(|_| Err(PollError::nonfatal(io::Error::other("late ack")))))
        .unwrap();
    reactor.on_poll().observe(move |_| handle.stop());

    reactor.set_show_nonfatal_errors(true);
    reactor.set_show_nonfatal_errors(false);
    assert!(reactor.run().is_ok());
    assert!(warnings_mentioning("late ack").is_empty());
}

#[test]
fn test_default_diagnostic_follows_continuing_observers() {
    init_logger();

    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let seen = Rc::new(Cell::new(0));

    reactor
        .add_connection(Probe::new(|_| {
            Err(PollError::nonfatal(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "stale ack",
            )))
        }))
        .unwrap();
    {
        let seen = seen.clone();
        reactor
            .on_nonfatal_error()
            .observe(move |_| seen.set(seen.get() + 1));
    }

    reactor.turn().unwrap();

    assert_eq!(seen.get(), 1);
    assert_eq!(
        warnings_mentioning("stale ack"),
        vec!["*** ConnectionReset : stale ack".to_owned()]
    );
}

#[test]
fn test_break_in_nonfatal_observer_suppresses_default_diagnostic() {
    init_logger();

    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let intercepted = Rc::new(Cell::new(0));
    let later = Rc::new(Cell::new(false));

    reactor
        .add_connection(Probe::new(|_| {
            Err(NonfatalError::msg("dropped frame").into())
        }))
        .unwrap();
    {
        let intercepted = intercepted.clone();
        reactor.on_nonfatal_error().intercept(move |_| {
            intercepted.set(intercepted.get() + 1);
            ControlFlow::Break(())
        });
    }
    {
        let later = later.clone();
        reactor.on_nonfatal_error().observe(move |_| later.set(true));
    }

    reactor.turn().unwrap();

    assert_eq!(intercepted.get(), 1);
    assert!(!later.get(), "observers after the break are skipped");
    assert!(warnings_mentioning("dropped frame").is_empty());
}

#[test]
fn test_fatal_connection_error_ends_run() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let hook_ran = Rc::new(Cell::new(false));

    let token = reactor
        .add_connection(Probe::new(|_| Err(io::Error::other("protocol violation").into())))
        .unwrap();
    {
        let hook_ran = hook_ran.clone();
        reactor.on_poll().observe(move |_| hook_ran.set(true));
    }

    let err = reactor.run().unwrap_err();

    assert!(matches!(err, Error::Connection { token: t, .. } if t == token));
    assert!(!hook_ran.get(), "the failing iteration does not reach on_poll");
    assert!(!reactor.is_running());
}

#[test]
fn test_selector_failure_is_connection_lost() {
    let mut reactor = Reactor::builder().selector(Failing).build();

    let err = reactor.run().unwrap_err();

    assert!(matches!(err, Error::ConnectionLost(_)));
    assert!(!reactor.is_running(), "running flag is cleared on failure");
}

#[test]
fn test_invalid_registrant_is_rejected_before_mutation() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[])).build();
    let handle = reactor.handle();

    let mut probe = Probe::new(|_| Ok(()));
    probe.handle = INVALID_HANDLE;
    assert!(matches!(
        reactor.add_connection(probe),
        Err(Error::InvalidRegistrant(_))
    ));

    let mut probe = Probe::new(|_| Ok(()));
    probe.handle = INVALID_HANDLE;
    assert!(matches!(
        handle.add_connection(probe),
        Err(Error::InvalidRegistrant(_))
    ));

    reactor.turn().unwrap();
    assert_eq!(reactor.connection_count(), 0);
}

#[test]
fn test_removed_connection_is_skipped_in_same_phase() {
    let mut reactor = Reactor::builder()
        .selector(Scripted::ready(&[0, 1]))
        .build();
    let victim: Rc<Cell<Option<Token>>> = Rc::new(Cell::new(None));
    let victim_polls = Rc::new(Cell::new(0));

    {
        let victim = victim.clone();
        reactor
            .add_connection(Probe::new(move |reactor| {
                if let Some(token) = victim.take() {
                    reactor.remove(token).unwrap();
                }
                Ok(())
            }))
            .unwrap();
    }
    {
        let victim_polls = victim_polls.clone();
        let token = reactor
            .add_connection(Probe::new(move |_| {
                victim_polls.set(victim_polls.get() + 1);
                Ok(())
            }))
            .unwrap();
        victim.set(Some(token));
    }

    reactor.turn().unwrap();

    assert_eq!(victim_polls.get(), 0);
    assert_eq!(reactor.connection_count(), 1);
}

#[test]
fn test_timer_added_during_connection_phase() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[0])).build();
    let fired = Rc::new(Cell::new(0));
    let armed = Rc::new(Cell::new(false));

    {
        let fired = fired.clone();
        reactor
            .add_connection(Probe::new(move |reactor| {
                if !armed.replace(true) {
                    let fired = fired.clone();
                    reactor
                        .add_timer(OneShotTimer::at(Instant::now(), move || {
                            fired.set(fired.get() + 1)
                        }))
                        .map_err(PollError::fatal)?;
                }
                Ok(())
            }))
            .unwrap();
    }

    reactor.turn().unwrap();
    assert_eq!(fired.get(), 1);
    assert_eq!(reactor.timer_count(), 0);

    reactor.turn().unwrap();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_remove_unknown_token_fails() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[])).build();
    let handle = reactor.handle();
    let token = reactor
        .add_timer(OneShotTimer::new(Duration::from_secs(60), || {}))
        .unwrap();

    assert!(reactor.remove(token).is_ok());
    assert!(matches!(reactor.remove(token), Err(Error::NotRegistered(_))));
    assert!(matches!(handle.remove(token), Err(Error::NotRegistered(_))));
    assert!(!handle.is_registered(token));
}

#[test]
fn test_timer_removed_by_earlier_timer_is_skipped() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[])).build();
    let handle = reactor.handle();
    let victim: Rc<Cell<Option<Token>>> = Rc::new(Cell::new(None));
    let victim_ticks = Rc::new(Cell::new(0));

    {
        let victim = victim.clone();
        reactor
            .add_timer(PeriodicTimer::new(Duration::ZERO, move || {
                if let Some(token) = victim.take() {
                    handle.remove(token).unwrap();
                }
            }))
            .unwrap();
    }
    {
        let victim_ticks = victim_ticks.clone();
        let token = reactor
            .add_timer(PeriodicTimer::new(Duration::ZERO, move || {
                victim_ticks.set(victim_ticks.get() + 1)
            }))
            .unwrap();
        victim.set(Some(token));
    }

    reactor.turn().unwrap();

    assert_eq!(victim_ticks.get(), 0);
    assert_eq!(reactor.timer_count(), 1);
}

#[test]
fn test_timer_added_during_timer_phase_waits_for_next_iteration() {
    let mut reactor = Reactor::builder().selector(Scripted::ready(&[])).build();
    let handle = reactor.handle();
    let late = Rc::new(Cell::new(0));

    {
        let late = late.clone();
        let mut armed = false;
        reactor
            .add_timer(PeriodicTimer::new(Duration::ZERO, move || {
                if !armed {
                    armed = true;
                    let late = late.clone();
                    handle
                        .add_timer(OneShotTimer::at(Instant::now(), move || {
                            late.set(late.get() + 1)
                        }))
                        .unwrap();
                }
            }))
            .unwrap();
    }

    reactor.turn().unwrap();
    assert_eq!(late.get(), 0, "not polled in the phase that added it");
    assert_eq!(reactor.timer_count(), 2);

    reactor.turn().unwrap();
    assert_eq!(late.get(), 1);
    assert_eq!(reactor.timer_count(), 1);
}
