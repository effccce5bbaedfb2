//! `.fvecs` and `.ivecs` record files.
//!
//! Each record is a little-endian `i32` dimension followed by that many
//! `f32` (fvecs) or `i32` (ivecs) components.
use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::DenseMatrixError;

/// Reads every fvecs record, returning the shared dimension and the values.
///
/// An empty stream yields a dimension of zero.
pub(crate) fn read_fvecs<R: Read>(mut reader: R) -> Result<(usize, Vec<f32>), DenseMatrixError> {
    let mut values = Vec::new();
    let mut dimension = None;
    let mut row = 0;
    while let Some(width) = read_record_header(&mut reader, row, dimension)? {
        dimension = Some(width);
        for _ in 0..width {
            let value = reader
                .read_f32::<LittleEndian>()
                .map_err(|err| truncated(err, row, width))?;
            values.push(value);
        }
        row += 1;
    }
    Ok((dimension.unwrap_or(0), values))
}

/// Reads every ivecs record.
///
/// Rows may have different lengths.
///
/// # Errors
/// Returns [`DenseMatrixError::InvalidRecordHeader`] for negative
/// dimensions, [`DenseMatrixError::TruncatedRecord`] when a record is cut
/// short, and I/O failures.
pub fn read_ivecs<R: Read>(mut reader: R) -> Result<Vec<Vec<i32>>, DenseMatrixError> {
    let mut rows = Vec::new();
    while let Some(width) = read_record_header(&mut reader, rows.len(), None)? {
        let row = rows.len();
        let record = (0..width)
            .map(|_| {
                reader
                    .read_i32::<LittleEndian>()
                    .map_err(|err| truncated(err, row, width))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(record);
    }
    Ok(rows)
}

/// Loads ground-truth neighbour labels from an `.ivecs` file.
///
/// # Errors
/// As [`read_ivecs`], plus [`DenseMatrixError::NegativeId`] for ids that
/// cannot be labels.
pub fn read_ground_truth(path: impl AsRef<Path>) -> Result<Vec<Vec<u64>>, DenseMatrixError> {
    let rows = read_ivecs(BufReader::new(File::open(path)?))?;
    rows.into_iter()
        .enumerate()
        .map(|(row, ids)| {
            ids.into_iter()
                .enumerate()
                .map(|(position, value)| {
                    u64::try_from(value).map_err(|_| DenseMatrixError::NegativeId {
                        row,
                        position,
                        value,
                    })
                })
                .collect()
        })
        .collect()
}

/// Writes `values` as fvecs records of `dimension` components.
///
/// # Errors
/// Returns [`DenseMatrixError::RaggedValues`] when `values` does not split
/// into whole rows, and I/O failures.
pub fn write_fvecs<W: Write>(
    mut writer: W,
    dimension: usize,
    values: &[f32],
) -> Result<(), DenseMatrixError> {
    let header = record_width(dimension)?;
    if dimension == 0 || values.len() % dimension != 0 {
        return Err(DenseMatrixError::RaggedValues {
            len: values.len(),
            dimension,
        });
    }
    for row in values.chunks_exact(dimension) {
        writer.write_i32::<LittleEndian>(header)?;
        for &value in row {
            writer.write_f32::<LittleEndian>(value)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes each row of `rows` as an ivecs record.
///
/// # Errors
/// Returns [`DenseMatrixError::CapacityOverflow`] for rows longer than
/// `i32::MAX`, and I/O failures.
pub fn write_ivecs<W: Write>(mut writer: W, rows: &[Vec<i32>]) -> Result<(), DenseMatrixError> {
    for row in rows {
        writer.write_i32::<LittleEndian>(record_width(row.len())?)?;
        for &value in row {
            writer.write_i32::<LittleEndian>(value)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn record_width(width: usize) -> Result<i32, DenseMatrixError> {
    i32::try_from(width).map_err(|_| DenseMatrixError::CapacityOverflow {
        rows: 1,
        dimension: width,
    })
}

/// Reads the next record's dimension, or `None` at a clean end of stream.
fn read_record_header<R: Read>(
    reader: &mut R,
    row: usize,
    expected: Option<usize>,
) -> Result<Option<usize>, DenseMatrixError> {
    let mut bytes = [0_u8; 4];
    let mut filled = 0;
    while filled < bytes.len() {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(DenseMatrixError::TruncatedRecord { row, expected: 0 }),
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    let declared = i32::from_le_bytes(bytes);
    let width = match usize::try_from(declared) {
        Ok(width) if width > 0 => width,
        _ => return Err(DenseMatrixError::InvalidRecordHeader { row, declared }),
    };
    match expected {
        Some(expected) if expected != width => Err(DenseMatrixError::InvalidRowLength {
            row,
            expected,
            actual: width,
        }),
        _ => Ok(Some(width)),
    }
}

fn truncated(err: std::io::Error, row: usize, expected: usize) -> DenseMatrixError {
    if err.kind() == ErrorKind::UnexpectedEof {
        DenseMatrixError::TruncatedRecord { row, expected }
    } else {
        err.into()
    }
}
