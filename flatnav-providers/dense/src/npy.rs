//! Minimal reader for NumPy `.npy` arrays of little-endian `float32`.
use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::DenseMatrixError;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const MAX_HEADER_LEN: usize = 1 << 16;
const MAX_PREALLOCATION: usize = 1 << 20;

/// Header fields this reader understands.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NpyHeader {
    pub(crate) descr: String,
    pub(crate) fortran_order: bool,
    pub(crate) shape: Vec<usize>,
}

/// Reads a 2-D C-order `<f4` array, returning `(rows, columns, values)`.
pub(crate) fn read_npy<R: Read>(mut reader: R) -> Result<(usize, usize, Vec<f32>), DenseMatrixError> {
    let header = read_header(&mut reader)?;
    if header.descr != "<f4" {
        return Err(DenseMatrixError::NpyDtype {
            descr: header.descr,
        });
    }
    if header.fortran_order {
        return Err(DenseMatrixError::NpyFortranOrder);
    }
    let [rows, columns] = header.shape[..] else {
        return Err(DenseMatrixError::NpyShape {
            shape: header.shape,
        });
    };
    let total = rows
        .checked_mul(columns)
        .ok_or(DenseMatrixError::CapacityOverflow {
            rows,
            dimension: columns,
        })?;
    let mut values = Vec::with_capacity(total.min(MAX_PREALLOCATION));
    for index in 0..total {
        match reader.read_f32::<LittleEndian>() {
            Ok(value) => values.push(value),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(DenseMatrixError::TruncatedRecord {
                    row: index / columns.max(1),
                    expected: columns,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok((rows, columns, values))
}

pub(crate) fn read_header<R: Read>(reader: &mut R) -> Result<NpyHeader, DenseMatrixError> {
    let mut magic = [0_u8; 6];
    reader.read_exact(&mut magic).map_err(|_| DenseMatrixError::NpyMagic)?;
    if &magic != MAGIC {
        return Err(DenseMatrixError::NpyMagic);
    }
    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    let len = match major {
        1 => usize::from(reader.read_u16::<LittleEndian>()?),
        2 | 3 => usize::try_from(reader.read_u32::<LittleEndian>()?)
            .map_err(|_| header_error("header length overflows"))?,
        _ => return Err(DenseMatrixError::NpyVersion { major, minor }),
    };
    if len > MAX_HEADER_LEN {
        return Err(header_error(format!("header of {len} bytes is implausibly large")));
    }
    let mut text = vec![0_u8; len];
    reader.read_exact(&mut text)?;
    let text = String::from_utf8(text).map_err(|_| header_error("header is not UTF-8"))?;
    parse_header(&text)
}

fn parse_header(text: &str) -> Result<NpyHeader, DenseMatrixError> {
    let descr = quoted_value(text, "descr")?;
    let fortran_order = match raw_value(text, "fortran_order")? {
        value if value.starts_with("True") => true,
        value if value.starts_with("False") => false,
        _ => return Err(header_error("fortran_order is not a boolean")),
    };
    let shape_text = raw_value(text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| header_error("shape is not a tuple"))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| header_error(format!("shape entry `{part}` is not a size")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

/// Text following `'key':`, with leading whitespace removed.
fn raw_value<'a>(text: &'a str, key: &str) -> Result<&'a str, DenseMatrixError> {
    let pattern = format!("'{key}':");
    text.split_once(&pattern)
        .map(|(_, rest)| rest.trim_start())
        .ok_or_else(|| header_error(format!("missing `{key}`")))
}

fn quoted_value(text: &str, key: &str) -> Result<String, DenseMatrixError> {
    raw_value(text, key)?
        .strip_prefix('\'')
        .and_then(|rest| rest.split_once('\''))
        .map(|(value, _)| value.to_owned())
        .ok_or_else(|| header_error(format!("`{key}` is not a string")))
}

fn header_error(reason: impl Into<String>) -> DenseMatrixError {
    DenseMatrixError::NpyHeader {
        reason: reason.into(),
    }
}

#[cfg(test)]
pub(crate) fn encode(shape: &[usize], descr: &str, fortran_order: bool, values: &[f32]) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    let shape_text = match dims.len() {
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    };
    let order = if fortran_order { "True" } else { "False" };
    let mut header =
        format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape_text}, }}");
    while (MAGIC.len() + 4 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&u16::try_from(header.len()).expect("short header").to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
