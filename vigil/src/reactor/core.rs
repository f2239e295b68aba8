use super::builder::ReactorBuilder;
use super::command::Command;
use super::handle::{ReactorHandle, Shared};
use super::hooks::NonfatalReport;
use super::poller::{Readiness, Selector, Watch};
use super::registrant::{Connection, Kind, Registrant, Token};
use crate::error::{Error, PollError, Result};
use crate::event::Observable;
use crate::timer::Timer;
use crate::utils::Registry;

use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// The event loop.
///
/// A `Reactor` owns a set of [`Connection`]s and a set of [`Timer`]s and
/// drives them from a single thread. Each iteration of [`run`](Self::run):
/// 1. computes how long it may block, from the idle poll interval and the
///    next timer activation,
/// 2. waits on the [`Selector`] for ready connections,
/// 3. polls every ready connection,
/// 4. polls every timer,
/// 5. fires the [`on_poll`](Self::on_poll) hook.
///
/// Connections, timers and observers reach the loop through a
/// [`ReactorHandle`].
pub struct Reactor {
    handle: ReactorHandle,

    /// Readiness back-end.
    selector: Box<dyn Selector>,

    connections: Registry<Box<dyn Connection>>,
    timers: Registry<Box<dyn Timer>>,

    /// Minimum of every timer's next activation.
    next_activation: Option<Instant>,

    /// Watch list handed to the selector, rebuilt every iteration.
    watches: Vec<Watch>,

    /// Connection id of each entry in `watches`.
    watched: Vec<u64>,

    /// Readiness buffer filled by the selector.
    ready: Vec<(usize, Readiness)>,
}

/// Clears the running flag when the loop exits, however it exits.
struct RunningGuard(Rc<Shared>);

impl RunningGuard {
    fn start(shared: Rc<Shared>) -> Self {
        shared.set_running(true);
        Self(shared)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.set_running(false);
    }
}

impl Reactor {
    /// Creates a reactor with the default configuration.
    pub fn new() -> Self {
        ReactorBuilder::new().build()
    }

    pub fn builder() -> ReactorBuilder {
        ReactorBuilder::new()
    }

    pub(crate) fn from_parts(
        selector: Box<dyn Selector>,
        poll_interval: Option<Duration>,
        show_nonfatal: bool,
    ) -> Self {
        Self {
            handle: ReactorHandle {
                shared: Rc::new(Shared::new(poll_interval, show_nonfatal)),
            },
            selector,
            connections: Registry::new(),
            timers: Registry::new(),
            next_activation: None,
            watches: Vec::with_capacity(64),
            watched: Vec::with_capacity(64),
            ready: Vec::with_capacity(64),
        }
    }

    /// Returns a handle to this reactor.
    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    fn shared(&self) -> &Shared {
        &self.handle.shared
    }

    /// Registers a connection or a timer.
    ///
    /// A registered timer is bound to this reactor and the next timer
    /// activation is recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegistrant`] if a connection's wait-handle is
    /// not a valid descriptor; the reactor is left unchanged.
    pub fn add(&mut self, registrant: Registrant) -> Result<Token> {
        let token = self.shared().register(registrant)?;
        self.apply_pending();
        Ok(token)
    }

    pub fn add_connection<C: Connection + 'static>(&mut self, connection: C) -> Result<Token> {
        self.add(Registrant::connection(connection))
    }

    pub fn add_timer<T: Timer + 'static>(&mut self, timer: T) -> Result<Token> {
        self.add(Registrant::timer(timer))
    }

    /// Deregisters `token` and hands the item back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if `token` is not registered.
    pub fn remove(&mut self, token: Token) -> Result<Registrant> {
        if !self.shared().forget(token) {
            return Err(Error::NotRegistered(token));
        }

        // the registration itself may still be queued
        self.apply_pending();

        self.take(token).ok_or(Error::NotRegistered(token))
    }

    /// Runs the loop until [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionLost`] if the readiness wait fails,
    /// - [`Error::Connection`] if a connection fails with an error it did
    ///   not classify as non-fatal.
    ///
    /// The running flag is cleared on every exit path.
    pub fn run(&mut self) -> Result<()> {
        let _running = RunningGuard::start(Rc::clone(&self.handle.shared));
        log::debug!(
            "reactor running with {} connection(s) and {} timer(s)",
            self.connections.len(),
            self.timers.len()
        );

        while self.shared().is_running() {
            self.turn()?;
        }

        log::debug!("reactor stopped");
        Ok(())
    }

    /// Runs exactly one loop iteration.
    ///
    /// Useful to embed the reactor in a loop owned by someone else, such as
    /// a frame loop. Errors are those of [`run`](Self::run).
    pub fn turn(&mut self) -> Result<()> {
        self.apply_pending();

        let timeout = wait_timeout(
            self.shared().poll_interval(),
            self.next_activation,
            Instant::now(),
        );
        self.collect_watches();
        log::trace!(
            "waiting up to {timeout:?} on {} connection(s)",
            self.watches.len()
        );

        if let Err(e) = self
            .selector
            .select(&self.watches, timeout, &mut self.ready)
        {
            log::error!("readiness wait failed: {e}");
            return Err(Error::ConnectionLost(e));
        }

        self.dispatch_ready()?;
        self.poll_timers(Instant::now());

        self.shared().hooks.on_poll.fire();
        self.apply_pending();

        Ok(())
    }

    /// Asks the loop to stop once the current iteration completes.
    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn is_running(&self) -> bool {
        self.shared().is_running()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.shared().poll_interval()
    }

    /// Sets the idle poll interval.
    ///
    /// `None` blocks until I/O or a timer is due, `Some(Duration::ZERO)`
    /// polls continuously.
    pub fn set_poll_interval(&self, interval: Option<Duration>) {
        self.shared().set_poll_interval(interval);
    }

    /// Enables or disables the default non-fatal diagnostic.
    pub fn set_show_nonfatal_errors(&self, show: bool) {
        self.shared().set_show_nonfatal(show);
    }

    /// Fired once at the end of every loop iteration.
    pub fn on_poll(&self) -> Observable<()> {
        self.handle.on_poll()
    }

    /// Fired for every non-fatal connection failure.
    ///
    /// An observer returning `ControlFlow::Break` suppresses the default
    /// diagnostic for that report.
    pub fn on_nonfatal_error(&self) -> Observable<NonfatalReport> {
        self.handle.on_nonfatal_error()
    }

    /// The cached time of the next timer activation.
    pub fn next_timer_activation(&self) -> Option<Instant> {
        self.next_activation
    }

    /// Recomputes the next timer activation from every registered timer.
    pub fn recompute_next_activation(&mut self) {
        self.next_activation = self
            .timers
            .values()
            .filter_map(|timer| timer.next_activation())
            .min();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Applies every queued registry change.
    fn apply_pending(&mut self) {
        while let Some(command) = self.shared().next_command() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Register { token, registrant } => match registrant {
                Registrant::Connection(connection) => {
                    log::debug!("registered {token} on handle {}", connection.handle());
                    self.connections.insert_with_id(token.id(), connection);
                }
                Registrant::Timer(mut timer) => {
                    timer.bind(&self.handle, token);
                    self.timers.insert_with_id(token.id(), timer);
                    self.recompute_next_activation();
                    log::debug!("registered {token}");
                }
            },
            Command::Deregister { token } => {
                if self.take(token).is_some() {
                    log::debug!("deregistered {token}");
                }
            }
        }
    }

    fn take(&mut self, token: Token) -> Option<Registrant> {
        match token.kind() {
            Kind::Connection => self
                .connections
                .remove(token.id())
                .map(Registrant::Connection),
            Kind::Timer => {
                let timer = self.timers.remove(token.id())?;
                self.recompute_next_activation();
                Some(Registrant::Timer(timer))
            }
        }
    }

    fn collect_watches(&mut self) {
        self.watches.clear();
        self.watched.clear();

        for (id, connection) in self.connections.iter() {
            self.watches.push(Watch {
                handle: connection.handle(),
                interest: connection.interest(),
            });
            self.watched.push(id);
        }
    }

    /// Polls every connection the selector reported ready.
    fn dispatch_ready(&mut self) -> Result<()> {
        let ready = std::mem::take(&mut self.ready);
        let result = self.dispatch(&ready);
        self.ready = ready;
        result
    }

    fn dispatch(&mut self, ready: &[(usize, Readiness)]) -> Result<()> {
        for &(index, readiness) in ready {
            let Some(&id) = self.watched.get(index) else {
                continue;
            };

            // removed earlier in this phase
            let Some(connection) = self.connections.get_mut(id) else {
                continue;
            };

            let token = Token::new(id, Kind::Connection);

            match connection.poll(readiness, &self.handle) {
                Ok(()) => {}
                Err(PollError::Nonfatal(error)) => {
                    let report = NonfatalReport::new(token, error);
                    self.handle.shared.hooks.report_nonfatal(&report);
                }
                Err(PollError::Fatal(source)) => {
                    log::error!("{token} failed: {source}");
                    return Err(Error::Connection { token, source });
                }
            }

            self.apply_pending();
        }

        Ok(())
    }

    /// Polls every timer registered when the phase started.
    fn poll_timers(&mut self, now: Instant) {
        let mut changed = false;

        for id in self.timers.ids() {
            if let Some(timer) = self.timers.get_mut(id) {
                changed |= timer.poll(now);
            }
            self.apply_pending();
        }

        if changed {
            self.recompute_next_activation();
        }
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.shared().clear();
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("connections", &self.connections.len())
            .field("timers", &self.timers.len())
            .field("next_activation", &self.next_activation)
            .field("poll_interval", &self.shared().poll_interval())
            .field("running", &self.shared().is_running())
            .finish()
    }
}

/// How long one iteration may block.
///
/// The idle poll interval and the time left until `next` (zero if already
/// due) bound the wait; the tighter one wins. `None` blocks indefinitely.
pub(crate) fn wait_timeout(
    poll_interval: Option<Duration>,
    next: Option<Instant>,
    now: Instant,
) -> Option<Duration> {
    let until_timer = next.map(|at| at.saturating_duration_since(now));

    match (poll_interval, until_timer) {
        (Some(interval), Some(until)) => Some(interval.min(until)),
        (interval, until) => interval.or(until),
    }
}
