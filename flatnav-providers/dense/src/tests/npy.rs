use super::DenseMatrixError;
use crate::npy::{encode, read_header, read_npy};
use rstest::rstest;

#[test]
fn reads_a_two_dimensional_array() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let bytes = encode(&[2, 3], "<f4", false, &values);
    assert_eq!(bytes.len() % 4, 0);
    let (rows, columns, read) = read_npy(bytes.as_slice()).expect("read");
    assert_eq!((rows, columns), (2, 3));
    assert_eq!(read, values);
}

#[test]
fn header_fields_are_parsed() {
    let bytes = encode(&[7, 2], "<f4", true, &[]);
    let header = read_header(&mut bytes.as_slice()).expect("header");
    assert_eq!(header.descr, "<f4");
    assert!(header.fortran_order);
    assert_eq!(header.shape, vec![7, 2]);
}

#[rstest]
#[case::float64(encode(&[1, 1], "<f8", false, &[]), "dtype")]
#[case::big_endian(encode(&[1, 1], ">f4", false, &[]), "dtype")]
#[case::fortran(encode(&[1, 1], "<f4", true, &[0.0]), "fortran")]
#[case::one_dimensional(encode(&[3], "<f4", false, &[0.0; 3]), "shape")]
#[case::three_dimensional(encode(&[1, 1, 1], "<f4", false, &[0.0]), "shape")]
fn unsupported_arrays_are_rejected(#[case] bytes: Vec<u8>, #[case] reason: &str) {
    let err = read_npy(bytes.as_slice()).expect_err("unsupported array");
    let matched = match reason {
        "dtype" => matches!(err, DenseMatrixError::NpyDtype { .. }),
        "fortran" => matches!(err, DenseMatrixError::NpyFortranOrder),
        _ => matches!(err, DenseMatrixError::NpyShape { .. }),
    };
    assert!(matched, "{err:?}");
}

#[test]
fn wrong_magic_is_rejected() {
    let err = read_npy(&b"PK\x03\x04 not numpy"[..]).expect_err("zip file");
    assert!(matches!(err, DenseMatrixError::NpyMagic));
}

#[test]
fn short_payload_is_truncated() {
    let bytes = encode(&[2, 2], "<f4", false, &[1.0, 2.0, 3.0]);
    let err = read_npy(bytes.as_slice()).expect_err("missing value");
    assert!(matches!(
        err,
        DenseMatrixError::TruncatedRecord { row: 1, expected: 2 }
    ));
}
