use crate::backend::Core;
use crate::field::Field;
use crate::level::Level;
use crate::record::{Caller, Record};
use std::backtrace::Backtrace;
use std::error::Error;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::field::{Field as TracingField, Visit};
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Event field that raises (or lowers) the level of a single event, e.g.
/// `error!(severity = "fatal", "disk gone")`. Accepts anything
/// [`Level`]'s `FromStr` accepts and is not written to the payload.
pub const SEVERITY_OVERRIDE_FIELD: &str = "severity";

/// `tracing_subscriber` layer that turns events into [`Record`]s and writes
/// them through a [`Core`].
///
/// Fields of enclosing spans are attached to every event inside them, root
/// span first, followed by the event's own fields. `tracing` gives the layer
/// no way to report a failed write back to the call site, so failures are
/// counted and printed to stderr.
pub struct CloudLoggingLayer {
    core: Core,
    stacktrace_level: Option<Level>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events encoded and accepted by the sink.
    pub written_events: Arc<AtomicU64>,
    /// Events whose encode, enqueue or flush failed.
    pub failed_events: Arc<AtomicU64>,
}

impl CloudLoggingLayer {
    pub fn new(core: Core, stacktrace_level: Option<Level>) -> Self {
        Self {
            core,
            stacktrace_level,
            total_events: Arc::new(AtomicU64::new(0)),
            written_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The core events are written through; call [`Core::sync`] on it at
    /// shutdown.
    pub fn core(&self) -> &Core {
        &self.core
    }

    fn wants_stack(&self, level: Level) -> bool {
        matches!(self.stacktrace_level, Some(min) if level >= min)
    }
}

struct SpanFields(Vec<Field>);

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::span();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.fields));
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::span();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(existing) => existing.0.extend(visitor.fields),
            None => extensions.insert(SpanFields(visitor.fields)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        let mut visitor = FieldVisitor::event();
        event.record(&mut visitor);

        let level = visitor
            .severity
            .unwrap_or_else(|| Level::from(*meta.level()));
        if !self.core.enabled(level) {
            return;
        }

        let mut record = Record::new(level, visitor.message.take().unwrap_or_default());
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record = record.with_caller(Caller::new(file, line));
        }
        if self.wants_stack(level) {
            record = record.with_stack(Backtrace::force_capture().to_string());
        }

        let Some(checked) = self.core.check(record) else {
            return;
        };

        let mut fields = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                    fields.extend(span_fields.0.iter().cloned());
                }
            }
        }
        fields.extend(visitor.fields);

        match checked.write(&fields) {
            Ok(()) => {
                self.written_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("failed to write log record: {}", e);
            }
        }
    }
}

struct FieldVisitor {
    fields: Vec<Field>,
    message: Option<String>,
    severity: Option<Level>,
    // Spans keep `message` and `severity` as ordinary fields.
    is_event: bool,
}

impl FieldVisitor {
    fn event() -> Self {
        Self {
            fields: Vec::new(),
            message: None,
            severity: None,
            is_event: true,
        }
    }

    fn span() -> Self {
        Self {
            is_event: false,
            ..Self::event()
        }
    }

    fn record_text(&mut self, field: &TracingField, text: String) {
        if self.is_event {
            match field.name() {
                "message" => {
                    self.message = Some(text);
                    return;
                }
                SEVERITY_OVERRIDE_FIELD => {
                    if let Ok(level) = text.trim_matches('"').parse() {
                        self.severity = Some(level);
                        return;
                    }
                }
                _ => {}
            }
        }
        self.fields.push(Field::str(field.name(), text));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.push(Field::i64(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.push(Field::u64(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.fields.push(Field::f64(field.name(), value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.push(Field::bool(field.name(), value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn Error + 'static)) {
        self.fields.push(Field::error(field.name(), value));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn std::fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }
}
