//! Observable events.
//!
//! An [`Observable`] is a multicast register-and-fire primitive: observers
//! subscribe callbacks, and triggering the observable invokes all of them
//! with the same arguments. Observers can short-circuit a dispatch, and an
//! optional fallback handles events nobody observes.
//!
//! The reactor exposes its lifecycle hooks as observables, and consumers
//! build their own event surfaces out of them.

mod observable;
mod trace;

pub use observable::{Callback, Observable, ObserverId};
pub use trace::{TraceArgs, TraceFields};
