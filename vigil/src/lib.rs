//! # Vigil
//!
//! **Vigil** is a single-threaded reactor: it multiplexes network
//! connections and timers on one thread and pushes notifications out to
//! registered observers.
//!
//! It is built from three pieces:
//!
//! - **Observables**: multicast callback registers with short-circuit
//!   dispatch and an "unhandled event" fallback,
//! - **Timers**: one-shot and periodic activations with catch-up semantics,
//! - **the Reactor**: the wait / dispatch / timer-poll loop, exposing its
//!   lifecycle hooks as observables.
//!
//! Everything runs on the thread that calls [`Reactor::run`]. The only
//! place the loop blocks is the readiness wait; every callback runs to
//! completion before the loop moves on.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use vigil::{PeriodicTimer, Reactor};
//!
//! let mut reactor = Reactor::new();
//! let handle = reactor.handle();
//!
//! let mut ticks = 0;
//! reactor.add_timer(PeriodicTimer::new(Duration::from_millis(100), move || {
//!     ticks += 1;
//!     println!("tick {ticks}");
//!     if ticks == 5 {
//!         handle.stop();
//!     }
//! }))?;
//!
//! reactor.on_poll().observe(|_| log::trace!("iteration finished"));
//! reactor.run()?;
//! ```
//!
//! ## Modules
//!
//! - [`event`]: observables and trace formatting
//! - [`timer`]: the timer capability and its one-shot and periodic forms
//!
//! The reactor types are re-exported at the crate root.
//!
//! ## Getting Started
//!
//! Add Vigil to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! vigil = { path = "vigil" }
//! ```

mod error;
mod reactor;
mod utils;

pub mod event;
pub mod timer;

pub use error::{BoxError, Error, NonfatalError, NonfatalExt, PollError, Result};
pub use event::{Callback, Observable, ObserverId};
pub use reactor::{
    Connection, DefaultSelector, Interest, Kind, NonfatalReport, RawHandle, Reactor,
    ReactorBuilder, ReactorHandle, Readiness, Registrant, Selector, Token, Watch, raw_handle,
};
pub use timer::{OneShotTimer, PeriodicTimer, Timer};
