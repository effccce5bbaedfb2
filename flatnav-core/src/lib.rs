//! Flatnav core library: a single-layer proximity graph for approximate
//! nearest-neighbour search, with optional product or low-precision
//! quantization of the stored vectors.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;

mod codec;
mod datatype;
pub mod distance;
mod index;
mod parallel;
mod persistence;
pub mod quantization;

pub use crate::{
    codec::{CodeElement, FlatCodec, VectorCodec},
    datatype::{DataType, DataTypeError, DataTypeErrorCode},
    distance::{Distance, DistanceError, DistanceErrorCode, Metric},
    error::ErrorKind,
    index::{
        Index, IndexError, IndexErrorCode, IndexParams, Invariant, InvariantChecker,
        InvariantViolation, Label, Neighbour, SearchHit,
    },
    parallel::{ParallelError, ParallelErrorCode, execute_in_parallel, try_execute_in_parallel},
    persistence::{
        AnyIndex, FORMAT_VERSION, MAGIC, PersistenceError, PersistenceErrorCode, PersistentCodec,
    },
    quantization::{
        LowPrecisionConfig, LowPrecisionQuantizer, ProductQuantizer, ProductQuantizerConfig,
        QuantizationMode, QuantizerError, QuantizerErrorCode, ScaleGranularity,
    },
};
