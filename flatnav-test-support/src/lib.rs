//! Shared test utilities used across flatnav crates.
//!
//! - [`tracing`] captures spans and events so instrumentation can be asserted.
//! - [`datasets`] generates seeded synthetic vectors.
//! - [`oracle`] computes exact neighbours and recall for accuracy checks.

pub mod datasets;
pub mod oracle;
pub mod tracing;
