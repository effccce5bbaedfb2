use super::{DataFormat, DenseMatrix, DenseMatrixError, support::*};
use crate::npy::encode;
use crate::{read_ground_truth, write_fvecs, write_ivecs};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

#[rstest]
#[case("parquet", DataFormat::Parquet)]
#[case("PQ", DataFormat::Parquet)]
#[case("fvecs", DataFormat::Fvecs)]
#[case("npy", DataFormat::Npy)]
fn parses_format_names(#[case] name: &str, #[case] expected: DataFormat) {
    assert_eq!(name.parse::<DataFormat>().expect("known format"), expected);
}

#[test]
fn unknown_extension_is_reported() {
    let err = DataFormat::from_path("vectors").expect_err("no extension");
    assert!(matches!(err, DenseMatrixError::UnknownFormat { path } if path == "vectors"));
}

#[test]
fn every_format_loads_the_same_matrix() {
    let dir = TempDir::new().expect("temporary directory");
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    let fvecs = dir.path().join("base.fvecs");
    let mut bytes = Vec::new();
    write_fvecs(&mut bytes, 3, &values).expect("fvecs");
    fs::write(&fvecs, bytes).expect("write fvecs");

    let npy = dir.path().join("base.npy");
    fs::write(&npy, encode(&[2, 3], "<f4", false, &values)).expect("write npy");

    let parquet = dir.path().join("base.parquet");
    let array = build_array(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    fs::write(&parquet, write_parquet(array)).expect("write parquet");

    for path in [&fvecs, &npy, &parquet] {
        let format = DataFormat::from_path(path).expect("known extension");
        let matrix = DenseMatrix::load(path, format, Some("features")).expect("load");
        assert_eq!(matrix.name(), "base");
        assert_eq!(matrix.data(), &values, "{format}");
        assert_eq!(matrix.dimension(), 3);
    }
}

#[test]
fn parquet_requires_a_column() {
    let err = DenseMatrix::load("unused.parquet", DataFormat::Parquet, None)
        .expect_err("no column");
    assert!(matches!(err, DenseMatrixError::MissingColumn));
}

#[test]
fn ground_truth_rejects_negative_ids() {
    let dir = TempDir::new().expect("temporary directory");
    let path = dir.path().join("gt.ivecs");
    let mut bytes = Vec::new();
    write_ivecs(&mut bytes, &[vec![0, 2], vec![1, -1]]).expect("ivecs");
    fs::write(&path, bytes).expect("write");
    let err = read_ground_truth(&path).expect_err("negative id");
    assert!(matches!(
        err,
        DenseMatrixError::NegativeId {
            row: 1,
            position: 1,
            value: -1
        }
    ));
}
