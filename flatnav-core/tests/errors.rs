use flatnav_core::{
    DataType, DataTypeError, DataTypeErrorCode, DistanceError, DistanceErrorCode, ErrorKind,
    IndexError, IndexErrorCode, ParallelError, ParallelErrorCode, PersistenceError,
    PersistenceErrorCode, QuantizationMode, QuantizerError, QuantizerErrorCode,
};
use rstest::rstest;

#[rstest]
#[case(DistanceError::ZeroLength, DistanceErrorCode::ZeroLength)]
#[case(
    DistanceError::UnknownMetric { name: "cosine".into() },
    DistanceErrorCode::UnknownMetric,
)]
#[case(DistanceError::UnknownMetricId { id: 9 }, DistanceErrorCode::UnknownMetricId)]
fn returns_expected_distance_code(
    #[case] error: DistanceError,
    #[case] expected: DistanceErrorCode,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().as_str(), expected.as_str());
    assert!(expected.as_str().starts_with("DISTANCE_"));
}

#[rstest]
#[case(QuantizerError::ZeroDimension, QuantizerErrorCode::ZeroDimension, ErrorKind::InvalidArgument)]
#[case(
    QuantizerError::InvalidBits { bits: 9 },
    QuantizerErrorCode::InvalidBits,
    ErrorKind::InvalidArgument,
)]
#[case(
    QuantizerError::InsufficientSamples { required: 16, provided: 3 },
    QuantizerErrorCode::InsufficientSamples,
    ErrorKind::InvalidArgument,
)]
#[case(
    QuantizerError::UnknownMode { name: "opq".into() },
    QuantizerErrorCode::UnknownMode,
    ErrorKind::UnsupportedConfiguration,
)]
fn returns_expected_quantizer_code(
    #[case] error: QuantizerError,
    #[case] expected: QuantizerErrorCode,
    #[case] kind: ErrorKind,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.kind(), kind);
}

#[rstest]
#[case(IndexError::ZeroTopK, IndexErrorCode::ZeroTopK, ErrorKind::InvalidArgument)]
#[case(
    IndexError::CapacityExhausted { capacity: 4 },
    IndexErrorCode::CapacityExhausted,
    ErrorKind::ResourceExhausted,
)]
#[case(
    IndexError::Parallel(ParallelError::ZeroThreads),
    IndexErrorCode::Parallel,
    ErrorKind::InvalidArgument,
)]
#[case(
    IndexError::Persistence(PersistenceError::Truncated),
    IndexErrorCode::Persistence,
    ErrorKind::CorruptData,
)]
fn index_errors_delegate_kind_to_their_source(
    #[case] error: IndexError,
    #[case] expected: IndexErrorCode,
    #[case] kind: ErrorKind,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.kind(), kind);
}

#[rstest]
#[case(PersistenceError::Truncated, PersistenceErrorCode::Truncated, ErrorKind::CorruptData)]
#[case(
    PersistenceError::BadMagic { found: *b"ABCD" },
    PersistenceErrorCode::BadMagic,
    ErrorKind::CorruptData,
)]
#[case(
    PersistenceError::ModeMismatch {
        expected: QuantizationMode::Product,
        found: QuantizationMode::None,
    },
    PersistenceErrorCode::ModeMismatch,
    ErrorKind::UnsupportedConfiguration,
)]
#[case(
    PersistenceError::Io(std::io::Error::other("disk")),
    PersistenceErrorCode::Io,
    ErrorKind::Io,
)]
fn persistence_errors_map_to_kinds(
    #[case] error: PersistenceError,
    #[case] expected: PersistenceErrorCode,
    #[case] kind: ErrorKind,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.kind(), kind);
}

#[test]
fn parallel_codes_are_stable() {
    assert_eq!(
        ParallelError::ZeroThreads.code().as_str(),
        ParallelErrorCode::ZeroThreads.as_str()
    );
    assert_eq!(ParallelErrorCode::ZeroThreads.as_str(), "PARALLEL_ZERO_THREADS");
}

#[test]
fn only_float32_is_indexable() {
    let err = DataType::Float64
        .ensure_indexable()
        .expect_err("float64 is rejected");
    assert_eq!(err.code(), DataTypeErrorCode::Unsupported);
    assert!(matches!(err, DataTypeError::Unsupported { .. }));
    DataType::Float32.ensure_indexable().expect("float32 accepted");
}
