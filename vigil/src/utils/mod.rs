//! Internal storage utilities.
//!
//! This module provides the [`Registry`] used by observables and the
//! reactor to store entries under stable, never-reused ids.

mod registry;

pub(crate) use registry::Registry;
