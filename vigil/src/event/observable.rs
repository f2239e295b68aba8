use super::trace::{TraceArgs, TraceFields};
use crate::error::{Error, Result};
use crate::utils::Registry;

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Identifies one registration on an [`Observable`].
///
/// Returned by every registering method and accepted by
/// [`Observable::unobserve`]. Ids are never reused within one observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// A shareable observer callback.
///
/// A `Callback` has identity: registering clones of the same callback
/// through [`Observable::observe_callback`] collapses to one registration.
pub struct Callback<A, R = ()>(Rc<dyn Fn(&A) -> ControlFlow<R>>);

impl<A, R> Callback<A, R> {
    /// A callback that never aborts dispatch.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&A) + 'static,
    {
        Self(Rc::new(move |args| {
            f(args);
            ControlFlow::Continue(())
        }))
    }

    /// A callback that may abort dispatch by returning [`ControlFlow::Break`].
    pub fn intercept<F>(f: F) -> Self
    where
        F: Fn(&A) -> ControlFlow<R> + 'static,
    {
        Self(Rc::new(f))
    }

    fn call(&self, args: &A) -> ControlFlow<R> {
        (self.0)(args)
    }

    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").finish_non_exhaustive()
    }
}

struct Inner<A, R> {
    observers: Registry<Callback<A, R>>,
    unhandled: Option<Rc<dyn Fn(&A)>>,
}

/// A multicast callback register.
///
/// Triggering an `Observable` invokes every registered observer once with
/// the same arguments. An observer registered with
/// [`intercept`](Self::intercept) can stop the dispatch by returning
/// `ControlFlow::Break(r)`; the remaining observers are skipped and
/// [`trigger`](Self::trigger) returns `Some(r)`.
///
/// When nobody observes, the optional *unhandled* fallback runs instead.
///
/// `Observable` is a shared handle: clones observe and trigger the same
/// registry. Observers may register and unregister (themselves included)
/// while a dispatch is in flight; dispatch always runs over the set taken
/// when [`trigger`](Self::trigger) was entered.
///
/// # Examples
///
/// ```rust,ignore
/// let on_join: Observable<(u32, String)> = Observable::new();
/// on_join.observe(|(id, name)| println!("{name} joined as {id}"));
/// on_join.trigger(&(1, "tank".into()));
/// ```
pub struct Observable<A = (), R = ()> {
    inner: Rc<RefCell<Inner<A, R>>>,
}

impl<A: 'static, R: 'static> Observable<A, R> {
    /// Creates an observable with no observers and no fallback.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                observers: Registry::new(),
                unhandled: None,
            })),
        }
    }

    /// Creates an observable pre-seeded with one observer.
    pub fn seeded<F>(f: F) -> Self
    where
        F: Fn(&A) + 'static,
    {
        let observable = Self::new();
        observable.observe(f);
        observable
    }

    /// Registers an observer that never aborts dispatch.
    pub fn observe<F>(&self, f: F) -> ObserverId
    where
        F: Fn(&A) + 'static,
    {
        self.register(Callback::new(f))
    }

    /// Registers an observer that may abort dispatch.
    pub fn intercept<F>(&self, f: F) -> ObserverId
    where
        F: Fn(&A) -> ControlFlow<R> + 'static,
    {
        self.register(Callback::intercept(f))
    }

    /// Registers a shared callback.
    ///
    /// If the same callback is already registered, its existing id is
    /// returned and delivery is not duplicated.
    pub fn observe_callback(&self, callback: &Callback<A, R>) -> ObserverId {
        let existing = self
            .inner
            .borrow()
            .observers
            .find(|registered| registered.same(callback));

        match existing {
            Some(id) => ObserverId(id),
            None => self.register(callback.clone()),
        }
    }

    /// Unregisters an observer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownObserver`] if `id` was never registered here
    /// or has already been removed.
    pub fn unobserve(&self, id: ObserverId) -> Result<()> {
        match self.inner.borrow_mut().observers.remove(id.0) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownObserver(id)),
        }
    }

    /// Installs the fallback invoked when a trigger finds no observers.
    pub fn set_unhandled<F>(&self, f: F)
    where
        F: Fn(&A) + 'static,
    {
        self.inner.borrow_mut().unhandled = Some(Rc::new(f));
    }

    pub fn clear_unhandled(&self) {
        self.inner.borrow_mut().unhandled = None;
    }

    /// Invokes every observer with `args`.
    ///
    /// Returns the value of the first observer that broke out of the
    /// dispatch, or `None` if every observer continued. With no observers
    /// the unhandled fallback, if any, is invoked once.
    pub fn trigger(&self, args: &A) -> Option<R> {
        let (snapshot, unhandled) = {
            let inner = self.inner.borrow();
            let snapshot: Vec<Callback<A, R>> = inner.observers.values().cloned().collect();
            (snapshot, inner.unhandled.clone())
        };

        if snapshot.is_empty() {
            if let Some(unhandled) = unhandled {
                unhandled(args);
            }
            return None;
        }

        for callback in snapshot {
            if let ControlFlow::Break(result) = callback.call(args) {
                return Some(result);
            }
        }

        None
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().observers.is_empty()
    }

    /// Drops every observer and the fallback.
    pub fn clear(&self) {
        let released = {
            let mut inner = self.inner.borrow_mut();
            (mem::take(&mut inner.observers), inner.unhandled.take())
        };

        // dropped outside the borrow: observers may own other observables
        drop(released);
    }

    /// Registers an observer that logs a line rendered from `fmt`.
    ///
    /// Lines are emitted at `info` level under the `vigil::trace` target.
    /// See [`TraceArgs`] for the placeholder syntax.
    pub fn trace(&self, fmt: impl Into<String>) -> ObserverId
    where
        A: TraceArgs,
    {
        self.trace_to(fmt, |line| log::info!(target: "vigil::trace", "{line}"))
    }

    /// Registers an observer that renders `fmt` and hands the line to `sink`.
    pub fn trace_to<S>(&self, fmt: impl Into<String>, sink: S) -> ObserverId
    where
        A: TraceArgs,
        S: Fn(&str) + 'static,
    {
        let fmt = fmt.into();

        self.observe(move |args: &A| {
            let mut fields = TraceFields::new();
            args.trace_fields(&mut fields);
            sink(&fields.render(&fmt));
        })
    }

    /// Registers an observer that logs the line built by `f`.
    pub fn trace_with<F>(&self, f: F) -> ObserverId
    where
        F: Fn(&A) -> String + 'static,
    {
        self.observe(move |args| log::info!(target: "vigil::trace", "{}", f(args)))
    }

    fn register(&self, callback: Callback<A, R>) -> ObserverId {
        ObserverId(self.inner.borrow_mut().observers.insert(callback))
    }
}

impl<R: 'static> Observable<(), R> {
    /// Triggers an argument-less observable.
    pub fn fire(&self) -> Option<R> {
        self.trigger(&())
    }
}

impl<A, R> Clone for Observable<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static, R: 'static> Default for Observable<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for Observable<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("observers", &inner.observers.len())
            .field("unhandled", &inner.unhandled.is_some())
            .finish()
    }
}
