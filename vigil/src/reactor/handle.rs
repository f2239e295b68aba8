use super::command::Command;
use super::hooks::{Hooks, NonfatalReport};
use super::registrant::{Connection, Registrant, Token};
use crate::error::{Error, Result};
use crate::event::Observable;
use crate::timer::Timer;

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// State shared between a reactor and its handles.
pub(crate) struct Shared {
    /// Cleared by `stop`; checked between iterations.
    running: Cell<bool>,

    /// Idle poll interval. `None` blocks until I/O or a timer is due.
    poll_interval: Cell<Option<Duration>>,

    /// Gates the default non-fatal diagnostic.
    show_nonfatal: Rc<Cell<bool>>,

    /// Next registration id.
    next_id: Cell<u64>,

    /// Tokens that are registered or queued for registration.
    registered: RefCell<HashSet<Token>>,

    /// Registry changes not yet applied by the loop.
    commands: RefCell<VecDeque<Command>>,

    pub(crate) hooks: Hooks,
}

impl Shared {
    pub(crate) fn new(poll_interval: Option<Duration>, show_nonfatal: bool) -> Self {
        let show_nonfatal = Rc::new(Cell::new(show_nonfatal));

        Self {
            running: Cell::new(false),
            poll_interval: Cell::new(poll_interval),
            hooks: Hooks::new(show_nonfatal.clone()),
            show_nonfatal,
            next_id: Cell::new(0),
            registered: RefCell::new(HashSet::new()),
            commands: RefCell::new(VecDeque::new()),
        }
    }

    /// Validates `registrant`, issues its token and queues its registration.
    pub(crate) fn register(&self, registrant: Registrant) -> Result<Token> {
        registrant.validate()?;

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let token = Token::new(id, registrant.kind());
        self.registered.borrow_mut().insert(token);
        self.commands
            .borrow_mut()
            .push_back(Command::Register { token, registrant });

        Ok(token)
    }

    /// Queues the removal of `token`.
    pub(crate) fn deregister(&self, token: Token) -> Result<()> {
        if !self.forget(token) {
            return Err(Error::NotRegistered(token));
        }

        self.commands
            .borrow_mut()
            .push_back(Command::Deregister { token });

        Ok(())
    }

    /// Marks `token` as no longer registered without queueing a command.
    ///
    /// Returns `false` if it was not registered.
    pub(crate) fn forget(&self, token: Token) -> bool {
        self.registered.borrow_mut().remove(&token)
    }

    pub(crate) fn is_registered(&self, token: Token) -> bool {
        self.registered.borrow().contains(&token)
    }

    pub(crate) fn next_command(&self) -> Option<Command> {
        self.commands.borrow_mut().pop_front()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.get()
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.set(running);
    }

    pub(crate) fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval.get()
    }

    pub(crate) fn set_poll_interval(&self, interval: Option<Duration>) {
        self.poll_interval.set(interval);
    }

    pub(crate) fn set_show_nonfatal(&self, show: bool) {
        self.show_nonfatal.set(show);
    }

    /// Drops queued commands and hook observers.
    ///
    /// Queued registrants and observers may hold handles to this state;
    /// clearing them breaks those reference cycles.
    pub(crate) fn clear(&self) {
        let pending = std::mem::take(&mut *self.commands.borrow_mut());
        drop(pending);

        self.registered.borrow_mut().clear();
        self.hooks.clear();
    }
}

/// A handle to a [`Reactor`](crate::Reactor).
///
/// Handles are how connections, timers and observers talk to the loop
/// while it is running: they can register and remove items, stop the
/// loop, and reach its hooks.
///
/// Registrations and removals made through a handle are validated
/// immediately and applied by the loop at its next safe point (after the
/// current connection poll, timer poll or hook dispatch). Items removed
/// this way are not visited again, even later in the same phase.
///
/// Handles are `!Send`: the reactor is single-threaded.
#[derive(Clone)]
pub struct ReactorHandle {
    pub(crate) shared: Rc<Shared>,
}

impl ReactorHandle {
    /// Queues the registration of `registrant` and returns its token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegistrant`] if a connection's wait-handle is
    /// not a valid descriptor. Nothing is registered in that case.
    pub fn add(&self, registrant: Registrant) -> Result<Token> {
        let token = self.shared.register(registrant)?;
        log::debug!("queued registration of {token}");
        Ok(token)
    }

    pub fn add_connection<C: Connection + 'static>(&self, connection: C) -> Result<Token> {
        self.add(Registrant::connection(connection))
    }

    pub fn add_timer<T: Timer + 'static>(&self, timer: T) -> Result<Token> {
        self.add(Registrant::timer(timer))
    }

    /// Queues the removal of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if `token` is not registered.
    pub fn remove(&self, token: Token) -> Result<()> {
        self.shared.deregister(token)?;
        log::debug!("queued removal of {token}");
        Ok(())
    }

    /// Whether `token` is registered (or queued for registration).
    pub fn is_registered(&self, token: Token) -> bool {
        self.shared.is_registered(token)
    }

    /// Asks the loop to stop after the current iteration.
    pub fn stop(&self) {
        self.shared.set_running(false);
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.shared.poll_interval()
    }

    /// Sets the idle poll interval.
    ///
    /// `None` blocks until I/O or a timer is due, `Some(Duration::ZERO)`
    /// polls continuously.
    pub fn set_poll_interval(&self, interval: Option<Duration>) {
        self.shared.set_poll_interval(interval);
    }

    /// Enables or disables the default non-fatal diagnostic.
    pub fn set_show_nonfatal_errors(&self, show: bool) {
        self.shared.set_show_nonfatal(show);
    }

    /// Fired once at the end of every loop iteration.
    pub fn on_poll(&self) -> Observable<()> {
        self.shared.hooks.on_poll.clone()
    }

    /// Fired for every non-fatal connection failure.
    ///
    /// An observer returning `ControlFlow::Break` suppresses the default
    /// diagnostic for that report.
    pub fn on_nonfatal_error(&self) -> Observable<NonfatalReport> {
        self.shared.hooks.on_nonfatal_error.clone()
    }
}

impl fmt::Debug for ReactorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorHandle")
            .field("running", &self.shared.is_running())
            .field("poll_interval", &self.shared.poll_interval())
            .finish_non_exhaustive()
    }
}
