//! Command-line interface for building and querying flatnav indexes.
//!
//! `build` loads a dataset, optionally trains a quantizer on it, inserts every
//! row and saves the index. `query` loads a saved index, answers a query file
//! and, given ground truth, reports recall@k.

mod commands;
mod recall;

pub use commands::{
    BuildCommand, Cli, CliError, Command, ExecutionSummary, Granularity, InputArgs, InputFormat,
    MetricArg, QuantizationArg, QueryCommand, render_summary, run_cli,
};
pub use recall::recall_at_k;
