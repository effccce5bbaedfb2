//! Support library for the `flatnav` binary.
//!
//! Exposes the command pipeline and logging setup so integration tests can
//! drive builds and queries without forking a subprocess.

pub mod cli;
pub mod logging;
