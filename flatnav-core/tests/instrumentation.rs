//! Tracing spans and events emitted by the public operations.

use flatnav_core::{
    FlatCodec, Index, IndexParams, Label, LowPrecisionConfig, Metric, ProductQuantizerConfig,
};
use flatnav_test_support::{datasets::uniform, tracing::RecordingLayer};
use tempfile::TempDir;
use tracing::Level;

fn small_index() -> Index<FlatCodec> {
    let index = Index::new(
        FlatCodec::new(Metric::Euclidean, 3).expect("codec"),
        IndexParams::new(4, 32).expect("params"),
    );
    let labels: Vec<Label> = (0..32).collect();
    index
        .insert_batch(&uniform(32, 3, 5), &labels, 8, 2)
        .expect("build");
    index
}

#[test]
fn batch_insertion_records_its_span_and_summary() {
    let (layer, guard) = RecordingLayer::install();
    let index = small_index();
    drop(guard);

    let span = layer.span("index.insert_batch").expect("batch span");
    assert_eq!(span.fields.get("rows").map(String::as_str), Some("32"));
    assert_eq!(span.fields.get("mode").map(String::as_str), Some("none"));
    assert!(layer.has_span("parallel.execute"));

    let summary = layer
        .events_at(Level::INFO)
        .into_iter()
        .find(|event| {
            event.fields.get("message").map(String::as_str) == Some("batch insertion finished")
        })
        .expect("summary event");
    assert_eq!(summary.fields["nodes"], index.len().to_string());
}

#[test]
fn failed_batches_record_the_error_on_the_span() {
    let index = Index::new(
        FlatCodec::new(Metric::Euclidean, 2).expect("codec"),
        IndexParams::new(4, 8).expect("params"),
    );
    let (layer, guard) = RecordingLayer::install();
    let result = index.insert_batch(&[0.0; 4], &[1, 2], 4, 0);
    drop(guard);

    assert!(result.is_err());
    let errors = layer.events_at(Level::ERROR);
    assert!(
        errors
            .iter()
            .any(|event| event.fields.get("error").is_some_and(|e| e.contains("thread"))),
        "{errors:?}"
    );
}

#[test]
fn save_and_load_are_instrumented() {
    let index = small_index();
    let dir = TempDir::new().expect("temporary directory");
    let path = dir.path().join("traced.fnav");

    let (layer, guard) = RecordingLayer::install();
    index.save(&path).expect("save");
    Index::<FlatCodec>::load(&path).expect("load");
    drop(guard);

    let save = layer.span("index.save").expect("save span");
    assert!(save.fields["path"].ends_with("traced.fnav"));
    assert!(layer.has_span("index.load"));
    assert!(
        layer
            .events_at(Level::INFO)
            .iter()
            .any(|event| event.fields.get("message").map(String::as_str) == Some("index loaded"))
    );
}

#[test]
fn quantizer_training_is_instrumented() {
    let data = uniform(64, 4, 9);
    let (layer, guard) = RecordingLayer::install();
    ProductQuantizerConfig::new(4, 2, 3, Metric::Euclidean)
        .expect("config")
        .train(&data, 64)
        .expect("pq");
    LowPrecisionConfig::new(4, 4, Metric::InnerProduct)
        .expect("config")
        .train(&data, 64)
        .expect("lpq");
    drop(guard);

    let pq = layer.span("pq.train").expect("pq span");
    assert_eq!(pq.fields["subspaces"], "2");
    let lpq = layer.span("lpq.train").expect("lpq span");
    assert_eq!(lpq.fields["bits"], "4");
}
