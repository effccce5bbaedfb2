//! Versioned, checksummed binary format for saved indexes.
//!
//! All integers are little-endian. The layout is:
//!
//! ```text
//! magic "FNAV" | u32 version
//! u8 mode | u8 metric
//! u64 dimension | u64 max_edges | u64 capacity | u64 count | u64 code_len
//! u64 entry (u64::MAX when empty)
//! codec state
//! count x (u64 label | u32 degree | degree x u32 neighbour)
//! count x code_len code elements
//! u32 crc32 of every preceding byte
//! ```
//!
//! Loading never returns a partially initialised index: every structural
//! field is validated and the checksum verified before the index is built.

mod any;
mod checksum;
mod codecs;
mod error;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info, instrument};

use crate::{
    codec::CodeElement,
    distance::Metric,
    index::{Graph, Index, IndexParams, Label},
    quantization::QuantizationMode,
};

pub use self::{
    any::AnyIndex,
    codecs::PersistentCodec,
    error::{PersistenceError, PersistenceErrorCode},
};
use self::checksum::{ChecksumReader, ChecksumWriter};

/// Leading bytes of every index file.
pub const MAGIC: [u8; 4] = *b"FNAV";
/// Format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

const EMPTY_ENTRY: u64 = u64::MAX;
/// Per-node bytes that do not depend on degree: label and degree.
const NODE_FIXED_LEN: u64 = 8 + 4;
const CHECKSUM_LEN: u64 = 4;
/// Upper bound on speculative preallocation from untrusted counts.
const MAX_PREALLOCATION: usize = 1 << 20;
const READ_CHUNK: usize = 1024;

/// Decoded fixed-size header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Header {
    pub(crate) mode: QuantizationMode,
    pub(crate) metric: Metric,
    pub(crate) dimension: usize,
    pub(crate) max_edges: usize,
    pub(crate) capacity: usize,
    pub(crate) count: usize,
    pub(crate) code_len: usize,
}

impl Header {
    fn read<R: Read>(reader: &mut R) -> Result<Self, PersistenceError> {
        let mut magic = [0_u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(PersistenceError::from_read)?;
        if magic != MAGIC {
            return Err(PersistenceError::BadMagic { found: magic });
        }
        let version = read_u32(reader)?;
        if version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion { version });
        }
        let mode = QuantizationMode::from_id(read_u8(reader)?)?;
        let metric = Metric::from_id(read_u8(reader)?)?;
        let dimension = read_len(reader, "dimension")?;
        let max_edges = read_len(reader, "max_edges")?;
        let capacity = read_len(reader, "capacity")?;
        let count = read_len(reader, "count")?;
        let code_len = read_len(reader, "code_len")?;
        let entry = read_u64(reader)?;

        if count > capacity {
            return Err(PersistenceError::inconsistent(format!(
                "node count {count} exceeds capacity {capacity}"
            )));
        }
        let expected_entry = if count == 0 { EMPTY_ENTRY } else { 0 };
        if entry != expected_entry {
            return Err(PersistenceError::inconsistent(format!(
                "entry point {entry} does not match node count {count}"
            )));
        }
        Ok(Self {
            mode,
            metric,
            dimension,
            max_edges,
            capacity,
            count,
            code_len,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<(), PersistenceError> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u8(self.mode.id())?;
        writer.write_u8(self.metric.id())?;
        for value in [
            self.dimension,
            self.max_edges,
            self.capacity,
            self.count,
            self.code_len,
        ] {
            writer.write_u64::<LittleEndian>(value as u64)?;
        }
        let entry = if self.count == 0 { EMPTY_ENTRY } else { 0 };
        writer.write_u64::<LittleEndian>(entry)?;
        Ok(())
    }
}

impl<C: PersistentCodec> Index<C> {
    /// Writes the index to `path`, replacing any existing file.
    ///
    /// # Errors
    /// Returns [`PersistenceError::Io`] when the file cannot be written.
    #[instrument(name = "index.save", err, skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(nodes = self.len(), "index saved");
        Ok(())
    }

    /// Serialises the index into `writer`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), PersistenceError> {
        let graph = self.graph_guard();
        let header = Header {
            mode: C::MODE,
            metric: self.codec().metric(),
            dimension: self.codec().dimension(),
            max_edges: self.params().max_edges(),
            capacity: self.params().capacity(),
            count: graph.len(),
            code_len: graph.code_len(),
        };

        let mut writer = ChecksumWriter::new(writer);
        header.write(&mut writer)?;
        self.codec().write_state(&mut writer)?;
        for (id, &label) in graph.labels().iter().enumerate() {
            let neighbours = graph.neighbours(id);
            writer.write_u64::<LittleEndian>(label)?;
            writer.write_u32::<LittleEndian>(neighbours.len() as u32)?;
            for &neighbour in neighbours {
                writer.write_u32::<LittleEndian>(neighbour as u32)?;
            }
        }
        for &element in graph.codes() {
            element.write_le(&mut writer)?;
        }
        let (checksum, mut inner) = writer.finish();
        inner.write_u32::<LittleEndian>(checksum)?;
        debug!(nodes = header.count, checksum, "index serialised");
        Ok(())
    }

    /// Loads an index previously written by [`Index::save`].
    ///
    /// # Errors
    /// Returns [`PersistenceError`] for unreadable, truncated, corrupt or
    /// mismatched files. No partially initialised index is returned.
    #[instrument(name = "index.load", err, skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        let mut reader = ChecksumReader::new(BufReader::new(file));
        let header = Header::read(&mut reader)?;
        let index = read_body(reader, header, Some(size))?;
        info!(nodes = header.count, "index loaded");
        Ok(index)
    }

    /// Deserialises an index from `reader`.
    ///
    /// # Errors
    /// As [`Index::load`].
    pub fn read_from<R: Read>(reader: R) -> Result<Self, PersistenceError> {
        let mut reader = ChecksumReader::new(reader);
        let header = Header::read(&mut reader)?;
        read_body(reader, header, None)
    }
}

/// Reads everything after the header into an `Index<C>`.
///
/// `file_len`, when known, bounds the size fields before any allocation.
pub(crate) fn read_body<C: PersistentCodec, R: Read>(
    mut reader: ChecksumReader<R>,
    header: Header,
    file_len: Option<u64>,
) -> Result<Index<C>, PersistenceError> {
    if header.mode != C::MODE {
        return Err(PersistenceError::ModeMismatch {
            expected: C::MODE,
            found: header.mode,
        });
    }
    let params = IndexParams::new(header.max_edges, header.capacity)
        .map_err(|err| PersistenceError::inconsistent(err.to_string()))?;
    let codec = C::read_state(&mut reader, header.metric, header.dimension)?;
    let code_len = codec.code_len();
    if header.code_len != code_len {
        return Err(PersistenceError::inconsistent(format!(
            "code length {} does not match codec code length {code_len}",
            header.code_len
        )));
    }
    if let Some(file_len) = file_len {
        ensure_fits(&header, reader.consumed(), size_of::<C::Element>() as u64, file_len)?;
    }

    let count = header.count;
    let mut labels: Vec<Label> = Vec::with_capacity(count.min(MAX_PREALLOCATION));
    let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(count.min(MAX_PREALLOCATION));
    for id in 0..count {
        labels.push(read_u64(&mut reader)?);
        let degree = read_u32(&mut reader)? as usize;
        if degree > header.max_edges {
            return Err(PersistenceError::inconsistent(format!(
                "node {id} has degree {degree} above max_edges {}",
                header.max_edges
            )));
        }
        let mut neighbours = Vec::with_capacity(degree.min(MAX_PREALLOCATION));
        for _ in 0..degree {
            let neighbour = read_u32(&mut reader)? as usize;
            if neighbour >= count {
                return Err(PersistenceError::inconsistent(format!(
                    "node {id} references neighbour {neighbour} outside {count} nodes"
                )));
            }
            neighbours.push(neighbour);
        }
        adjacency.push(neighbours);
    }

    let total = count.checked_mul(code_len).ok_or_else(|| {
        PersistenceError::inconsistent("code buffer size overflows the address space")
    })?;
    let mut codes: Vec<C::Element> = Vec::with_capacity(total.min(MAX_PREALLOCATION));
    for _ in 0..total {
        codes.push(C::Element::read_le(&mut reader).map_err(PersistenceError::from_read)?);
    }
    for code in codes.chunks_exact(code_len.max(1)) {
        codec.check_code(code)?;
    }

    let consumed = reader.consumed();
    let (computed, mut inner) = reader.finish();
    let stored = read_u32(&mut inner)?;
    if stored != computed {
        return Err(PersistenceError::ChecksumMismatch { stored, computed });
    }
    if let Some(file_len) = file_len
        && consumed + CHECKSUM_LEN != file_len
    {
        return Err(PersistenceError::inconsistent(format!(
            "{} trailing bytes after checksum",
            file_len.saturating_sub(consumed + CHECKSUM_LEN)
        )));
    }

    let graph = Graph::from_parts(code_len, codes, labels, adjacency);
    Ok(Index::from_parts(codec, params, graph))
}

/// Rejects headers whose minimum body size exceeds the file.
fn ensure_fits(
    header: &Header,
    consumed: u64,
    element_size: u64,
    file_len: u64,
) -> Result<(), PersistenceError> {
    let count = header.count as u64;
    let required = count
        .checked_mul(NODE_FIXED_LEN)
        .and_then(|nodes| {
            count
                .checked_mul(header.code_len as u64)
                .and_then(|elements| elements.checked_mul(element_size))
                .and_then(|codes| nodes.checked_add(codes))
        })
        .and_then(|body| body.checked_add(consumed + CHECKSUM_LEN));
    match required {
        Some(required) if required <= file_len => Ok(()),
        _ => Err(PersistenceError::inconsistent(format!(
            "header describes {count} nodes but the file holds only {file_len} bytes"
        ))),
    }
}

fn read_len<R: Read>(reader: &mut R, field: &str) -> Result<usize, PersistenceError> {
    let value = read_u64(reader)?;
    usize::try_from(value).map_err(|_| {
        PersistenceError::inconsistent(format!("{field} {value} does not fit in memory"))
    })
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8, PersistenceError> {
    reader.read_u8().map_err(PersistenceError::from_read)
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32, PersistenceError> {
    reader
        .read_u32::<LittleEndian>()
        .map_err(PersistenceError::from_read)
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64, PersistenceError> {
    reader
        .read_u64::<LittleEndian>()
        .map_err(PersistenceError::from_read)
}

/// Reads `len` floats in bounded chunks, so an inflated length runs into the
/// end of the stream before it can force a large allocation.
pub(crate) fn read_f32s<R: Read>(reader: &mut R, len: usize) -> Result<Vec<f32>, PersistenceError> {
    let mut values = Vec::with_capacity(len.min(MAX_PREALLOCATION));
    let mut chunk = [0.0_f32; READ_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let take = remaining.min(READ_CHUNK);
        let slot = &mut chunk[..take];
        reader
            .read_f32_into::<LittleEndian>(slot)
            .map_err(PersistenceError::from_read)?;
        values.extend_from_slice(slot);
        remaining -= take;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Magic, version, mode, metric and six `u64` fields.
    const HEADER_LEN: u64 = 4 + 4 + 1 + 1 + 6 * 8;

    #[test]
    fn header_length_matches_layout() {
        let header = Header {
            mode: QuantizationMode::None,
            metric: Metric::Euclidean,
            dimension: 3,
            max_edges: 4,
            capacity: 10,
            count: 0,
            code_len: 3,
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).expect("write");
        assert_eq!(bytes.len() as u64, HEADER_LEN);
        assert_eq!(Header::read(&mut bytes.as_slice()).expect("read"), header);
    }

    #[test]
    fn header_rejects_count_above_capacity() {
        let header = Header {
            mode: QuantizationMode::None,
            metric: Metric::Euclidean,
            dimension: 1,
            max_edges: 1,
            capacity: 1,
            count: 2,
            code_len: 1,
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).expect("write");
        let err = Header::read(&mut bytes.as_slice()).expect_err("count above capacity");
        assert!(matches!(err, PersistenceError::Inconsistent { .. }));
    }

    #[test]
    fn ensure_fits_rejects_oversized_counts() {
        let header = Header {
            mode: QuantizationMode::None,
            metric: Metric::Euclidean,
            dimension: 4,
            max_edges: 4,
            capacity: u32::MAX as usize,
            count: u32::MAX as usize,
            code_len: 4,
        };
        assert!(ensure_fits(&header, HEADER_LEN, 4, 1024).is_err());
    }
}
