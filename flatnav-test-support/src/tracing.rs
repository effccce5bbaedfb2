//! Recording layer for capturing spans and events in tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// Layer that keeps every closed span and emitted event in memory.
///
/// Clones share the same buffers, so a test can install one clone as the
/// thread-default subscriber and inspect another afterwards.
#[derive(Clone, Default)]
pub struct RecordingLayer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingLayer {
    /// Installs a fresh layer as the thread-default subscriber.
    ///
    /// The layer records until the returned guard drops.
    ///
    /// # Examples
    /// ```
    /// use flatnav_test_support::tracing::RecordingLayer;
    ///
    /// let (layer, guard) = RecordingLayer::install();
    /// tracing::info_span!("build").in_scope(|| tracing::info!(nodes = 3, "done"));
    /// drop(guard);
    /// assert!(layer.has_span("build"));
    /// assert_eq!(layer.events()[0].fields["nodes"], "3");
    /// ```
    #[must_use]
    pub fn install() -> (Self, DefaultGuard) {
        let layer = Self::default();
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        (layer, tracing::subscriber::set_default(subscriber))
    }

    /// Closed spans in completion order.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().expect("lock poisoned").clone()
    }

    /// Events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().expect("lock poisoned").clone()
    }

    /// Whether a span called `name` has closed.
    #[must_use]
    pub fn has_span(&self, name: &str) -> bool {
        self.spans
            .lock()
            .expect("lock poisoned")
            .iter()
            .any(|span| span.name == name)
    }

    /// First closed span called `name`, if any.
    #[must_use]
    pub fn span(&self, name: &str) -> Option<SpanRecord> {
        self.spans
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|span| span.name == name)
            .cloned()
    }

    /// Events at exactly `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<EventRecord> {
        self.events
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }
}

/// A closed span with its recorded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name from the metadata.
    pub name: String,
    /// Fields recorded at creation or through `Span::record`.
    pub fields: HashMap<String, String>,
}

/// An emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event level.
    pub level: Level,
    /// Event target, usually the emitting module path.
    pub target: String,
    /// Structured fields, including `message`.
    pub fields: HashMap<String, String>,
}

struct PendingSpan {
    name: String,
    fields: HashMap<String, String>,
}

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldRecorder(&mut fields));
        span.extensions_mut().insert(PendingSpan {
            name: attrs.metadata().name().to_owned(),
            fields,
        });
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(pending) = span.extensions_mut().get_mut::<PendingSpan>() {
            values.record(&mut FieldRecorder(&mut pending.fields));
        }
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let Some(pending) = span.extensions_mut().remove::<PendingSpan>() else {
            return;
        };
        self.spans.lock().expect("lock poisoned").push(SpanRecord {
            name: pending.name,
            fields: pending.fields,
        });
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.events.lock().expect("lock poisoned").push(EventRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            fields,
        });
    }
}

struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

impl FieldRecorder<'_> {
    fn put(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_owned(), value);
    }
}

macro_rules! record_display {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(&mut self, field: &Field, value: $ty) {
                self.put(field, value.to_string());
            }
        )*
    };
}

impl Visit for FieldRecorder<'_> {
    record_display!(
        record_bool: bool,
        record_i64: i64,
        record_u64: u64,
        record_i128: i128,
        record_u128: u128,
        record_f64: f64,
        record_str: &str,
    );

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_fields_added_after_creation() {
        let (layer, guard) = RecordingLayer::install();
        {
            let span = tracing::info_span!("load", nodes = tracing::field::Empty);
            span.record("nodes", 12_u64);
        }
        drop(guard);
        let span = layer.span("load").expect("closed span");
        assert_eq!(span.fields.get("nodes").map(String::as_str), Some("12"));
    }

    #[test]
    fn filters_events_by_level() {
        let (layer, guard) = RecordingLayer::install();
        tracing::warn!("slow");
        tracing::debug!(ids = ?[1, 2], "detail");
        drop(guard);
        assert_eq!(layer.events_at(Level::WARN).len(), 1);
        let debug = layer.events_at(Level::DEBUG);
        assert_eq!(debug[0].fields["ids"], "[1, 2]");
    }
}
