//! Helpers for copying Arrow fixed-size list arrays into row-major buffers.
use arrow_array::{Array, FixedSizeListArray, Float32Array};
use arrow_schema::{DataType, Field};

use crate::errors::DenseMatrixError;

/// Checks a schema field and returns its list width.
pub(crate) fn validate_fixed_size_list_field(
    field: &Field,
    column: &str,
) -> Result<usize, DenseMatrixError> {
    let DataType::FixedSizeList(child, width) = field.data_type() else {
        return Err(DenseMatrixError::InvalidColumnType {
            column: column.to_owned(),
            actual: field.data_type().clone(),
        });
    };
    if field.is_nullable() || child.is_nullable() {
        return Err(DenseMatrixError::NullableField {
            column: column.to_owned(),
            nullable_child: child.is_nullable(),
        });
    }
    if child.data_type() != &DataType::Float32 {
        return Err(DenseMatrixError::InvalidListValueType {
            actual: child.data_type().clone(),
        });
    }
    match usize::try_from(*width) {
        Ok(0) | Err(_) => Err(DenseMatrixError::InvalidDimension { actual: *width }),
        Ok(dimension) => Ok(dimension),
    }
}

/// Appends every row of `array` to `out`, returning the list width.
///
/// `start_row` offsets row numbers in error reports so multi-batch readers
/// point at the absolute row.
pub(crate) fn append_fixed_size_list_values(
    array: &FixedSizeListArray,
    expected_dimension: Option<usize>,
    start_row: usize,
    out: &mut Vec<f32>,
) -> Result<usize, DenseMatrixError> {
    let dimension = list_width(array)?;
    if let Some(expected) = expected_dimension.filter(|&expected| expected != dimension) {
        return Err(DenseMatrixError::InconsistentBatchDimension {
            expected,
            actual: dimension,
        });
    }
    copy_list_values(array, dimension, start_row, out)?;
    Ok(dimension)
}

fn list_width(array: &FixedSizeListArray) -> Result<usize, DenseMatrixError> {
    let value_type = array.value_type();
    if value_type != DataType::Float32 {
        return Err(DenseMatrixError::InvalidListValueType { actual: value_type });
    }
    match usize::try_from(array.value_length()) {
        Ok(0) | Err(_) => Err(DenseMatrixError::InvalidDimension {
            actual: array.value_length(),
        }),
        Ok(dimension) => Ok(dimension),
    }
}

pub(crate) fn copy_list_values(
    array: &FixedSizeListArray,
    dimension: usize,
    start_row: usize,
    out: &mut Vec<f32>,
) -> Result<(), DenseMatrixError> {
    let rows = array.len();
    let additional = rows
        .checked_mul(dimension)
        .ok_or(DenseMatrixError::CapacityOverflow { rows, dimension })?;
    out.reserve(additional);
    for row_index in 0..rows {
        let row = start_row + row_index;
        if array.is_null(row_index) {
            return Err(DenseMatrixError::NullRow { row });
        }
        let list = array.value(row_index);
        let floats = list.as_any().downcast_ref::<Float32Array>().ok_or_else(|| {
            DenseMatrixError::InvalidListValueType {
                actual: list.data_type().clone(),
            }
        })?;
        if floats.len() != dimension {
            return Err(DenseMatrixError::InvalidRowLength {
                row,
                expected: dimension,
                actual: floats.len(),
            });
        }
        if let Some(value_index) = (0..dimension).find(|&idx| floats.is_null(idx)) {
            return Err(DenseMatrixError::NullValue { row, value_index });
        }
        out.extend_from_slice(floats.values());
    }
    Ok(())
}
