//! The reactor.
//!
//! This module implements the event loop and everything it is made of:
//! - the [`Reactor`] itself and its [`ReactorBuilder`],
//! - [`ReactorHandle`], through which registrants and observers talk to a
//!   running loop,
//! - the [`Connection`] capability and the [`Registrant`] union,
//! - the lifecycle hooks,
//! - the platform [`Selector`] back-ends.

mod builder;
mod command;
mod core;
mod handle;
mod hooks;
mod registrant;

pub(crate) mod poller;

pub use builder::ReactorBuilder;
pub use self::core::Reactor;
pub use handle::ReactorHandle;
pub use hooks::NonfatalReport;
pub use poller::{DefaultSelector, Interest, RawHandle, Readiness, Selector, Watch, raw_handle};
pub use registrant::{Connection, Kind, Registrant, Token};
