//! Event and metric definitions for sampling CPU performance counters.
//!
//! Loads architecture specific PMU event catalogs, drops the events the target platform cannot
//! count, expands uncore events into per-device events and rewrites metric formulas into a form
//! an expression evaluator can consume.

#![deny(missing_docs, missing_debug_implementations)]

mod errors;
pub use errors::{Error, Result};

pub mod platform;
pub use platform::{CollectionContext, CollectionScope, Metadata};

pub mod pmu;

pub mod perf;
