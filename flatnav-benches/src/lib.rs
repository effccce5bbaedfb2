//! Benchmark support crate for flatnav.
//!
//! Provides seeded synthetic datasets, parameter types, an index-building
//! helper, and recall reporting for the Criterion benchmarks covering graph
//! construction, beam search, and quantizer training.

pub mod build;
pub mod error;
pub mod params;
pub mod recall;
pub mod source;
