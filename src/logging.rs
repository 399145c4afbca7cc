//! In-process capture of tracing output.
//!
//! [`channel_layer`] returns a `tracing_subscriber` layer together with the
//! receiving end of a channel; every span opened and every event emitted
//! under a subscriber carrying the layer arrives on the receiver as a
//! [`CapturedEvent`].
//!
//! ```
//! use lifeguard_hydrator::logging::channel_layer;
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let (layer, rx) = channel_layer();
//! let subscriber = tracing_subscriber::registry().with(layer);
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!(rows = 2, "hydrated");
//! });
//!
//! let event = rx.try_recv().unwrap();
//! assert_eq!(event.fields.get("rows").map(String::as_str), Some("2"));
//! ```

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::span::Attributes;
use tracing::{Event, Id, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturedKind {
    SpanOpened,
    Event,
}

/// A span or event seen by a [`ChannelLayer`]
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub kind: CapturedKind,
    pub level: Level,
    pub target: String,
    /// Span name, or the event's callsite name
    pub name: String,
    /// Name of the innermost span the event was emitted in
    pub parent_span: Option<String>,
    /// Recorded fields; an event's message is under `message`
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }
}

/// Layer forwarding spans and events over a channel
#[derive(Clone)]
pub struct ChannelLayer {
    tx: Sender<CapturedEvent>,
}

impl ChannelLayer {
    fn send(&self, event: CapturedEvent) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

impl<S> Layer<S> for ChannelLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent_span = ctx.lookup_current().map(|span| span.name().to_string());

        self.send(CapturedEvent {
            kind: CapturedKind::SpanOpened,
            level: *metadata.level(),
            target: metadata.target().to_string(),
            name: metadata.name().to_string(),
            parent_span,
            fields: visitor.fields,
        });
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let parent_span = ctx.event_span(event).map(|span| span.name().to_string());

        self.send(CapturedEvent {
            kind: CapturedKind::Event,
            level: *metadata.level(),
            target: metadata.target().to_string(),
            name: metadata.name().to_string(),
            parent_span,
            fields: visitor.fields,
        });
    }
}

/// Build a [`ChannelLayer`] and the receiver its captures arrive on
pub fn channel_layer() -> (ChannelLayer, Receiver<CapturedEvent>) {
    let (tx, rx) = unbounded();
    (ChannelLayer { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tracing_helpers;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_spans_and_nested_events() {
        let (layer, rx) = channel_layer();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let _span = tracing_helpers::to_map_span("id").entered();
            tracing::warn!(index = 3u64, "duplicate key");
        });

        let captured: Vec<_> = rx.try_iter().collect();
        assert_eq!(captured.len(), 2);

        assert_eq!(captured[0].kind, CapturedKind::SpanOpened);
        assert_eq!(captured[0].name, "lifeguard_hydrator.result_set.to_map");
        assert_eq!(captured[0].fields.get("key").map(String::as_str), Some("id"));

        assert_eq!(captured[1].kind, CapturedKind::Event);
        assert_eq!(captured[1].level, Level::WARN);
        assert_eq!(captured[1].message(), Some("duplicate key"));
        assert_eq!(captured[1].fields.get("index").map(String::as_str), Some("3"));
        assert_eq!(
            captured[1].parent_span.as_deref(),
            Some("lifeguard_hydrator.result_set.to_map")
        );
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (layer, rx) = channel_layer();
        drop(rx);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || tracing::info!("nobody listening"));
    }
}
