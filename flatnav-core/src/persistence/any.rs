//! Loading an index whose codec is only known from its file.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use tracing::{info, instrument};

use crate::{
    codec::{FlatCodec, VectorCodec},
    distance::Metric,
    index::{Index, IndexError, IndexParams, SearchHit},
    quantization::{LowPrecisionQuantizer, ProductQuantizer, QuantizationMode},
};

use super::{Header, PersistenceError, checksum::ChecksumReader, read_body};

/// An index with any of the built-in codecs.
///
/// The persisted quantization mode decides the variant at load time.
#[derive(Debug)]
pub enum AnyIndex {
    /// Raw `f32` vectors.
    Flat(Index<FlatCodec>),
    /// Product-quantized codes.
    Product(Index<ProductQuantizer>),
    /// Low-precision scalar codes.
    LowPrecision(Index<LowPrecisionQuantizer>),
}

macro_rules! dispatch {
    ($self:expr, $index:ident => $body:expr) => {
        match $self {
            AnyIndex::Flat($index) => $body,
            AnyIndex::Product($index) => $body,
            AnyIndex::LowPrecision($index) => $body,
        }
    };
}

impl AnyIndex {
    /// Loads an index of whichever codec the file records.
    ///
    /// # Errors
    /// As [`Index::load`].
    #[instrument(name = "any_index.load", err, skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        let index = Self::read_limited(BufReader::new(file), Some(size))?;
        info!(mode = %index.mode(), nodes = index.len(), "index loaded");
        Ok(index)
    }

    /// Deserialises an index of whichever codec the stream records.
    ///
    /// # Errors
    /// As [`Index::read_from`].
    pub fn read_from<R: Read>(reader: R) -> Result<Self, PersistenceError> {
        Self::read_limited(reader, None)
    }

    fn read_limited<R: Read>(reader: R, file_len: Option<u64>) -> Result<Self, PersistenceError> {
        let mut reader = ChecksumReader::new(reader);
        let header = Header::read(&mut reader)?;
        Ok(match header.mode {
            QuantizationMode::None => Self::Flat(read_body(reader, header, file_len)?),
            QuantizationMode::Product => Self::Product(read_body(reader, header, file_len)?),
            QuantizationMode::LowPrecision => {
                Self::LowPrecision(read_body(reader, header, file_len)?)
            }
        })
    }

    /// Writes the index to `path`.
    ///
    /// # Errors
    /// As [`Index::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        dispatch!(self, index => index.save(path))
    }

    /// Quantization mode of the stored codes.
    #[must_use]
    pub fn mode(&self) -> QuantizationMode {
        dispatch!(self, index => index.codec().mode())
    }

    /// Metric the index ranks by.
    #[must_use]
    pub fn metric(&self) -> Metric {
        dispatch!(self, index => index.metric())
    }

    /// Dimensionality of accepted queries.
    #[must_use]
    pub fn dimension(&self) -> usize {
        dispatch!(self, index => index.dimension())
    }

    /// Structural parameters of the loaded graph.
    #[must_use]
    pub fn params(&self) -> IndexParams {
        dispatch!(self, index => index.params())
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }

    /// Whether the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// See [`Index::search`].
    ///
    /// # Errors
    /// As [`Index::search`].
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        dispatch!(self, index => index.search(query, top_k, ef_search))
    }

    /// See [`Index::search_batch`].
    ///
    /// # Errors
    /// As [`Index::search_batch`].
    pub fn search_batch(
        &self,
        queries: &[f32],
        top_k: usize,
        ef_search: usize,
        num_threads: usize,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError> {
        dispatch!(self, index => index.search_batch(queries, top_k, ef_search, num_threads))
    }
}

impl From<Index<FlatCodec>> for AnyIndex {
    fn from(index: Index<FlatCodec>) -> Self {
        Self::Flat(index)
    }
}

impl From<Index<ProductQuantizer>> for AnyIndex {
    fn from(index: Index<ProductQuantizer>) -> Self {
        Self::Product(index)
    }
}

impl From<Index<LowPrecisionQuantizer>> for AnyIndex {
    fn from(index: Index<LowPrecisionQuantizer>) -> Self {
        Self::LowPrecision(index)
    }
}
