//! Save/load behaviour of persisted indexes.

use std::fs;

use flatnav_core::{
    AnyIndex, ErrorKind, FlatCodec, Index, IndexParams, Invariant, Label, LowPrecisionConfig,
    LowPrecisionQuantizer, Metric, PersistenceError, PersistenceErrorCode, PersistentCodec,
    ProductQuantizer, ProductQuantizerConfig, QuantizationMode, ScaleGranularity, VectorCodec,
};
use flatnav_test_support::datasets::uniform;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const DIMENSION: usize = 8;
const ROWS: usize = 120;
const MODE_OFFSET: usize = 8;
const DIMENSION_OFFSET: usize = 10;
const MAX_EDGES_OFFSET: usize = 18;
/// Magic, version, mode, metric and six `u64` fields.
const HEADER_LEN: usize = 4 + 4 + 1 + 1 + 6 * 8;

fn build<C: VectorCodec>(codec: C, data: &[f32]) -> Index<C> {
    let rows = data.len() / DIMENSION;
    let index = Index::new(codec, IndexParams::new(6, rows).expect("params"));
    let labels: Vec<Label> = (0..rows as Label).map(|row| row + 1000).collect();
    index.insert_batch(data, &labels, 24, 2).expect("build");
    index
}

fn flat_index(data: &[f32]) -> Index<FlatCodec> {
    build(FlatCodec::new(Metric::Euclidean, DIMENSION).expect("codec"), data)
}

fn serialise<C: PersistentCodec>(index: &Index<C>) -> Vec<u8> {
    let mut bytes = Vec::new();
    index.write_to(&mut bytes).expect("serialise");
    bytes
}

fn assert_same_structure<C: VectorCodec>(left: &Index<C>, right: &Index<C>) {
    assert_eq!(left.len(), right.len());
    assert_eq!(left.params(), right.params());
    assert_eq!(left.metric(), right.metric());
    for id in 0..left.len() {
        assert_eq!(left.label(id), right.label(id));
        assert_eq!(left.neighbours(id), right.neighbours(id));
        assert_eq!(left.stored_code(id), right.stored_code(id), "code of node {id}");
        assert_eq!(left.reconstruct(id), right.reconstruct(id), "vector of node {id}");
    }
}

fn product_codec(data: &[f32]) -> ProductQuantizer {
    ProductQuantizerConfig::new(DIMENSION, 4, 4, Metric::Euclidean)
        .expect("config")
        .with_seed(5)
        .train(data, ROWS)
        .expect("train")
}

fn patch(bytes: &mut [u8], offset: usize, value: &[u8]) {
    bytes
        .get_mut(offset..offset + value.len())
        .expect("field inside the stream")
        .copy_from_slice(value);
}

#[fixture]
fn data() -> Vec<f32> {
    uniform(ROWS, DIMENSION, 17)
}

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("temporary directory")
}

#[rstest]
fn flat_index_survives_a_round_trip(data: Vec<f32>, workdir: TempDir) {
    let index = flat_index(&data);
    let path = workdir.path().join("flat.fnav");
    index.save(&path).expect("save");

    let loaded = Index::<FlatCodec>::load(&path).expect("load");
    assert_same_structure(&index, &loaded);
    let query = data.get(..DIMENSION).expect("first row");
    assert_eq!(
        index.search(query, 5, 16).expect("search"),
        loaded.search(query, 5, 16).expect("search")
    );
    loaded
        .invariants()
        .check_many([
            Invariant::NeighbourValidity,
            Invariant::DegreeBounds,
            Invariant::BidirectionalLinks,
        ])
        .expect("loaded graph is valid");
}

#[rstest]
fn product_index_survives_a_round_trip(data: Vec<f32>, workdir: TempDir) {
    let index = build(product_codec(&data), &data);
    let path = workdir.path().join("pq.fnav");
    index.save(&path).expect("save");

    let loaded = Index::<ProductQuantizer>::load(&path).expect("load");
    assert_same_structure(&index, &loaded);
    assert_eq!(index.codec().centroids(), loaded.codec().centroids());
    assert_eq!(loaded.codec().config().seed(), 5);
}

#[rstest]
#[case(ScaleGranularity::Global)]
#[case(ScaleGranularity::PerDimension)]
fn low_precision_index_survives_a_round_trip(
    data: Vec<f32>,
    workdir: TempDir,
    #[case] granularity: ScaleGranularity,
) {
    let codec = LowPrecisionConfig::new(DIMENSION, 6, Metric::InnerProduct)
        .expect("config")
        .with_granularity(granularity)
        .train(&data, ROWS)
        .expect("train");
    let index = build(codec, &data);
    let path = workdir.path().join("lpq.fnav");
    index.save(&path).expect("save");

    let loaded = Index::<LowPrecisionQuantizer>::load(&path).expect("load");
    assert_same_structure(&index, &loaded);
    assert_eq!(loaded.codec().config().granularity(), granularity);
    assert_eq!(index.codec().min(), loaded.codec().min());
    assert_eq!(index.codec().delta(), loaded.codec().delta());
}

#[rstest]
fn empty_index_round_trips(workdir: TempDir) {
    let index = Index::new(
        FlatCodec::new(Metric::InnerProduct, 3).expect("codec"),
        IndexParams::new(4, 10).expect("params"),
    );
    let path = workdir.path().join("empty.fnav");
    index.save(&path).expect("save");
    let loaded = Index::<FlatCodec>::load(&path).expect("load");
    assert!(loaded.is_empty());
    assert_eq!(loaded.params().capacity(), 10);
    assert!(loaded.search(&[0.0; 3], 1, 1).expect("search").is_empty());
}

#[rstest]
fn any_index_picks_the_stored_codec(data: Vec<f32>, workdir: TempDir) {
    let codec = LowPrecisionConfig::new(DIMENSION, 8, Metric::Euclidean)
        .expect("config")
        .train(&data, ROWS)
        .expect("train");
    let index = build(codec, &data);
    let path = workdir.path().join("any.fnav");
    index.save(&path).expect("save");

    let loaded = AnyIndex::load(&path).expect("load");
    assert!(matches!(loaded, AnyIndex::LowPrecision(_)));
    assert_eq!(loaded.mode(), QuantizationMode::LowPrecision);
    assert_eq!(loaded.dimension(), DIMENSION);
    assert_eq!(loaded.len(), ROWS);
    let query = data.get(..DIMENSION).expect("first row");
    assert_eq!(
        loaded.search(query, 3, 12).expect("search"),
        index.search(query, 3, 12).expect("search")
    );
}

#[rstest]
fn loading_with_the_wrong_codec_is_rejected(data: Vec<f32>, workdir: TempDir) {
    let path = workdir.path().join("flat.fnav");
    flat_index(&data).save(&path).expect("save");
    let err = Index::<ProductQuantizer>::load(&path).expect_err("flat file");
    assert!(matches!(
        err,
        PersistenceError::ModeMismatch {
            expected: QuantizationMode::Product,
            found: QuantizationMode::None,
        }
    ));
    assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
}

#[rstest]
fn missing_file_is_an_io_error(workdir: TempDir) {
    let err = AnyIndex::load(workdir.path().join("absent.fnav")).expect_err("no file");
    assert_eq!(err.code(), PersistenceErrorCode::Io);
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[rstest]
#[case::magic(0, PersistenceErrorCode::BadMagic)]
#[case::version(4, PersistenceErrorCode::UnsupportedVersion)]
#[case::mode(MODE_OFFSET, PersistenceErrorCode::Quantizer)]
#[case::metric(MODE_OFFSET + 1, PersistenceErrorCode::Distance)]
fn corrupt_header_fields_are_detected(
    data: Vec<f32>,
    #[case] offset: usize,
    #[case] expected: PersistenceErrorCode,
) {
    let mut bytes = serialise(&flat_index(&data));
    bytes[offset] = 0x7f;
    let err = AnyIndex::read_from(bytes.as_slice()).expect_err("corrupt header");
    assert_eq!(err.code(), expected);
}

#[rstest]
fn unknown_identifiers_are_unsupported_configuration(data: Vec<f32>) {
    let mut bytes = serialise(&flat_index(&data));
    bytes[MODE_OFFSET] = 9;
    let err = AnyIndex::read_from(bytes.as_slice()).expect_err("unknown mode");
    assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(100)]
fn truncated_streams_are_detected(data: Vec<f32>, #[case] missing: usize) {
    let bytes = serialise(&flat_index(&data));
    let cut = bytes.get(..bytes.len() - missing).expect("shorter prefix");
    let err = Index::<FlatCodec>::read_from(cut).expect_err("truncated");
    assert!(matches!(err, PersistenceError::Truncated), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::CorruptData);
}

#[rstest]
fn truncated_files_fail_before_reading_the_body(data: Vec<f32>, workdir: TempDir) {
    let bytes = serialise(&flat_index(&data));
    let path = workdir.path().join("short.fnav");
    fs::write(&path, &bytes[..bytes.len() / 2]).expect("write");
    let err = Index::<FlatCodec>::load(&path).expect_err("half a file");
    assert_eq!(err.kind(), ErrorKind::CorruptData);
}

#[rstest]
#[case::past_the_stream(1_u64 << 56)]
#[case::overflowing_table(1_u64 << 62)]
fn inflated_dimension_in_codec_state_is_rejected(data: Vec<f32>, #[case] dimension: u64) {
    let mut bytes = serialise(&build(product_codec(&data), &data));
    patch(&mut bytes, DIMENSION_OFFSET, &dimension.to_le_bytes());
    let err = AnyIndex::read_from(bytes.as_slice()).expect_err("inflated dimension");
    assert_eq!(err.kind(), ErrorKind::CorruptData, "got {err:?}");
}

#[rstest]
fn inflated_degree_is_rejected_without_reserving_it(data: Vec<f32>) {
    let mut bytes = serialise(&flat_index(&data));
    patch(&mut bytes, MAX_EDGES_OFFSET, &u64::from(u32::MAX).to_le_bytes());
    // Node 0's degree follows its label, right after the header.
    patch(&mut bytes, HEADER_LEN + 8, &u32::MAX.to_le_bytes());
    let err = Index::<FlatCodec>::read_from(bytes.as_slice()).expect_err("inflated degree");
    assert_eq!(err.kind(), ErrorKind::CorruptData, "got {err:?}");
}

#[rstest]
fn flipped_label_byte_fails_the_checksum(data: Vec<f32>) {
    let mut bytes = serialise(&flat_index(&data));
    // The flat codec stores no state, so node 0's label follows the header.
    bytes[HEADER_LEN] ^= 0x01;
    let err = Index::<FlatCodec>::read_from(bytes.as_slice()).expect_err("flipped label");
    assert_eq!(err.code(), PersistenceErrorCode::ChecksumMismatch);
}

#[rstest]
fn flipped_trailer_fails_the_checksum(data: Vec<f32>) {
    let mut bytes = serialise(&flat_index(&data));
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    let err = Index::<FlatCodec>::read_from(bytes.as_slice()).expect_err("flipped trailer");
    assert!(matches!(err, PersistenceError::ChecksumMismatch { .. }));
}

#[rstest]
fn trailing_bytes_in_a_file_are_rejected(data: Vec<f32>, workdir: TempDir) {
    let mut bytes = serialise(&flat_index(&data));
    bytes.extend_from_slice(&[0, 0, 0]);
    let path = workdir.path().join("padded.fnav");
    fs::write(&path, &bytes).expect("write");
    let err = AnyIndex::load(&path).expect_err("trailing bytes");
    assert_eq!(err.code(), PersistenceErrorCode::Inconsistent);
}

#[rstest]
fn saving_replaces_an_existing_file(data: Vec<f32>, workdir: TempDir) {
    let path = workdir.path().join("index.fnav");
    fs::write(&path, b"stale").expect("write");
    flat_index(&data).save(&path).expect("save");
    assert_eq!(AnyIndex::load(&path).expect("load").len(), ROWS);
}
