use crate::error::EncodeError;
use crate::field::{Field, FieldValue};
use crate::level::Level;
use crate::record::{Caller, Record};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const TIME_KEY: &str = "time";
pub const SEVERITY_KEY: &str = "severity";
pub const CALLER_KEY: &str = "caller";
pub const MESSAGE_KEY: &str = "message";
pub const STACKTRACE_KEY: &str = "stacktrace";

/// How the `time` key is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeEncoding {
    /// `2024-05-01T12:30:45.123Z`
    #[default]
    Iso8601,
    /// `2024-05-01T12:30:45Z`
    Rfc3339,
    /// RFC 3339 with as many fractional digits as needed.
    Rfc3339Nano,
    /// Floating point seconds since the Unix epoch.
    EpochSeconds,
    /// Floating point milliseconds since the Unix epoch.
    EpochMillis,
}

impl TimeEncoding {
    pub fn encode(self, time: DateTime<Utc>) -> Value {
        match self {
            TimeEncoding::Iso8601 => rfc3339(time, SecondsFormat::Millis),
            TimeEncoding::Rfc3339 => rfc3339(time, SecondsFormat::Secs),
            TimeEncoding::Rfc3339Nano => rfc3339(time, SecondsFormat::AutoSi),
            TimeEncoding::EpochSeconds => Value::from(
                time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9,
            ),
            TimeEncoding::EpochMillis => Value::from(
                time.timestamp_millis() as f64
                    + f64::from(time.timestamp_subsec_nanos() % 1_000_000) / 1e6,
            ),
        }
    }
}

fn rfc3339(time: DateTime<Utc>, format: SecondsFormat) -> Value {
    Value::from(time.to_rfc3339_opts(format, true))
}

/// How [`FieldValue::Duration`] values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationEncoding {
    /// Floating point milliseconds.
    #[default]
    Millis,
    /// Floating point seconds.
    Seconds,
    /// Integer nanoseconds.
    Nanos,
    /// Human readable, e.g. `1.5s`.
    String,
}

impl DurationEncoding {
    pub fn encode(self, duration: Duration) -> Value {
        match self {
            DurationEncoding::Millis => Value::from(
                duration.as_secs() as f64 * 1e3 + f64::from(duration.subsec_nanos()) / 1e6,
            ),
            DurationEncoding::Seconds => Value::from(duration.as_secs_f64()),
            DurationEncoding::Nanos => {
                Value::from(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
            }
            DurationEncoding::String => Value::from(format!("{:?}", duration)),
        }
    }
}

/// How the `caller` key is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallerEncoding {
    /// Last directory and file name: `src/core.rs:42`.
    #[default]
    Short,
    /// The path as recorded: `/build/app/src/core.rs:42`.
    Full,
}

impl CallerEncoding {
    pub fn encode(self, caller: &Caller) -> String {
        match self {
            CallerEncoding::Short => format!("{}:{}", trim_path(&caller.file), caller.line),
            CallerEncoding::Full => format!("{}:{}", caller.file, caller.line),
        }
    }
}

fn trim_path(file: &str) -> &str {
    let is_sep = |c: char| c == '/' || c == '\\';
    let Some(last) = file.rfind(is_sep) else {
        return file;
    };
    match file[..last].rfind(is_sep) {
        Some(prev) => &file[prev + 1..],
        None => file,
    }
}

/// Rendering options for the structured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub line_ending: String,
    pub time: TimeEncoding,
    pub duration: DurationEncoding,
    pub caller: CallerEncoding,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            line_ending: "\n".to_string(),
            time: TimeEncoding::default(),
            duration: DurationEncoding::default(),
            caller: CallerEncoding::default(),
        }
    }
}

/// Textual level tag written under the `severity` key.
///
/// This is finer-grained than [`crate::severity::to_severity`]: the three
/// critical tiers each get their own tag.
///
/// # Panics
///
/// Panics on [`Level::INVALID`]. That level is never produced by this crate,
/// so reaching it means a caller fabricated it.
pub fn level_text(level: Level) -> &'static str {
    match level {
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
        Level::CRITICAL => "CRITICAL",
        Level::PANIC => "ALERT",
        Level::FATAL => "EMERGENCY",
        Level::INVALID => panic!("encountered invalid log level"),
        _ => "UNKNOWN",
    }
}

/// JSON encoder producing the log viewer's structured-logging object.
///
/// The configuration is shared between clones; the sticky fields are owned,
/// so cloning an encoder and adding fields to the clone never affects the
/// original. `encode` only reads `self`, which lets many threads encode
/// through the same encoder at once.
#[derive(Debug, Clone)]
pub struct Encoder {
    config: Arc<EncoderConfig>,
    sticky: Map<String, Value>,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config: Arc::new(config),
            sticky: Map::new(),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn sticky_fields(&self) -> &Map<String, Value> {
        &self.sticky
    }

    /// Encode `fields` and keep them for every later record. Nothing is
    /// added if any of the fields fails to encode.
    pub fn add_fields(&mut self, fields: &[Field]) -> Result<(), EncodeError> {
        let encoded = fields
            .iter()
            .map(|field| Ok((field.key.clone(), self.encode_value(field)?)))
            .collect::<Result<Vec<_>, EncodeError>>()?;
        self.sticky.extend(encoded);
        Ok(())
    }

    /// Render `record` with the sticky fields followed by `fields`.
    ///
    /// Later keys overwrite earlier ones, so call-site fields shadow sticky
    /// fields and both may shadow the reserved keys. `stacktrace` is always
    /// written last.
    pub fn encode(&self, record: &Record, fields: &[Field]) -> Result<Vec<u8>, EncodeError> {
        let mut object = Map::new();
        object.insert(TIME_KEY.to_string(), self.config.time.encode(record.time));
        object.insert(SEVERITY_KEY.to_string(), Value::from(level_text(record.level)));
        if let Some(caller) = &record.caller {
            object.insert(CALLER_KEY.to_string(), Value::from(self.config.caller.encode(caller)));
        }
        object.insert(MESSAGE_KEY.to_string(), Value::from(record.message.as_str()));

        for (key, value) in &self.sticky {
            object.insert(key.clone(), value.clone());
        }
        for field in fields {
            object.insert(field.key.clone(), self.encode_value(field)?);
        }

        if let Some(stack) = record.stack.as_deref().filter(|s| !s.is_empty()) {
            object.insert(STACKTRACE_KEY.to_string(), Value::from(stack));
        }

        let mut buf = serde_json::to_vec(&object)?;
        buf.extend_from_slice(self.config.line_ending.as_bytes());
        Ok(buf)
    }

    fn encode_value(&self, field: &Field) -> Result<Value, EncodeError> {
        let value = match &field.value {
            FieldValue::Str(s) => Value::from(s.as_str()),
            FieldValue::I64(n) => Value::from(*n),
            FieldValue::U64(n) => Value::from(*n),
            FieldValue::F64(n) => float(*n),
            FieldValue::Bool(b) => Value::from(*b),
            FieldValue::Duration(d) => self.config.duration.encode(*d),
            FieldValue::Error(text) => Value::from(text.as_str()),
            FieldValue::Json(json) => json.clone(),
            FieldValue::Unserializable(reason) => {
                return Err(EncodeError::Unserializable {
                    key: field.key.clone(),
                    reason: reason.clone(),
                })
            }
        };
        Ok(value)
    }
}

/// JSON has no literal for NaN or the infinities; those are written as
/// the strings `"NaN"`, `"+Inf"` and `"-Inf"`.
fn float(n: f64) -> Value {
    match serde_json::Number::from_f64(n) {
        Some(number) => Value::Number(number),
        None if n.is_nan() => Value::from("NaN"),
        None if n > 0.0 => Value::from("+Inf"),
        None => Value::from("-Inf"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:30:45.123456789Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(level: Level, message: &str) -> Record {
        Record::new(level, message)
            .with_time(fixed_time())
            .with_caller(Caller::new("/home/build/app/src/handler.rs", 42))
    }

    struct Broken;

    impl serde::Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refused"))
        }
    }

    fn decode(bytes: &[u8]) -> Map<String, Value> {
        match serde_json::from_slice(bytes).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn minimal_record_has_exactly_the_reserved_keys() {
        let encoder = Encoder::new(EncoderConfig::default());
        let bytes = encoder.encode(&record(Level::INFO, "Hello, world!"), &[]).unwrap();
        assert!(bytes.ends_with(b"\n"));

        let object = decode(&bytes);
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["time", "severity", "caller", "message"]);
        assert_eq!(object["severity"], "INFO");
        assert_eq!(object["message"], "Hello, world!");
        assert_eq!(object["time"], "2024-05-01T12:30:45.123Z");
        assert_eq!(object["caller"], "src/handler.rs:42");
        assert!(!object.contains_key("stacktrace"));
    }

    #[test]
    fn level_text_distinguishes_critical_tiers() {
        let expected = [
            (Level::DEBUG, "DEBUG"),
            (Level::INFO, "INFO"),
            (Level::WARN, "WARNING"),
            (Level::ERROR, "ERROR"),
            (Level::CRITICAL, "CRITICAL"),
            (Level::PANIC, "ALERT"),
            (Level::FATAL, "EMERGENCY"),
            (Level::new(-5), "UNKNOWN"),
            (Level::new(100), "UNKNOWN"),
        ];
        for (level, text) in expected {
            assert_eq!(level_text(level), text);
        }
    }

    #[test]
    #[should_panic(expected = "encountered invalid log level")]
    fn invalid_level_panics() {
        let encoder = Encoder::new(EncoderConfig::default());
        let _ = encoder.encode(&record(Level::INVALID, "boom"), &[]);
    }

    #[test]
    fn call_fields_shadow_sticky_fields() {
        let mut encoder = Encoder::new(EncoderConfig::default());
        encoder
            .add_fields(&[Field::str("k", "sticky"), Field::str("other", "kept")])
            .unwrap();

        let fields = [Field::str("k", "call")];
        let object = decode(&encoder.encode(&record(Level::INFO, "m"), &fields).unwrap());
        assert_eq!(object["k"], "call");
        assert_eq!(object["other"], "kept");
    }

    #[test]
    fn fields_may_overwrite_reserved_keys_but_not_the_stacktrace() {
        let encoder = Encoder::new(EncoderConfig::default());
        let rec = record(Level::ERROR, "original").with_stack("frame 0");
        let fields = [Field::str("message", "replaced"), Field::str("stacktrace", "fake")];

        let object = decode(&encoder.encode(&rec, &fields).unwrap());
        assert_eq!(object["message"], "replaced");
        assert_eq!(object["stacktrace"], "frame 0");
        assert_eq!(object.keys().last().map(String::as_str), Some("stacktrace"));
    }

    #[test]
    fn cloned_encoder_keeps_its_own_sticky_fields() {
        let mut parent = Encoder::new(EncoderConfig::default());
        parent.add_fields(&[Field::str("service", "api")]).unwrap();

        let mut child = parent.clone();
        child.add_fields(&[Field::u64("shard", 7)]).unwrap();

        assert!(!parent.sticky_fields().contains_key("shard"));
        assert_eq!(child.sticky_fields()["shard"], 7);
        assert_eq!(child.sticky_fields()["service"], "api");
    }

    #[test]
    fn failed_add_leaves_sticky_fields_untouched() {
        let mut encoder = Encoder::new(EncoderConfig::default());
        let err = encoder
            .add_fields(&[Field::str("a", "b"), Field::object("payload", &Broken)])
            .unwrap_err();
        assert!(matches!(err, EncodeError::Unserializable { ref key, .. } if key == "payload"));
        assert!(encoder.sticky_fields().is_empty());
    }

    #[test]
    fn unencodable_call_fields_fail_the_encode() {
        let encoder = Encoder::new(EncoderConfig::default());
        let err = encoder
            .encode(&record(Level::INFO, "m"), &[Field::object("payload", &Broken)])
            .unwrap_err();
        match err {
            EncodeError::Unserializable { key, reason } => {
                assert_eq!(key, "payload");
                assert!(reason.contains("refused"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_finite_floats_are_written_as_strings() {
        let encoder = Encoder::new(EncoderConfig::default());
        let fields = [
            Field::f64("p99", f64::NAN),
            Field::f64("max", f64::INFINITY),
            Field::f64("min", f64::NEG_INFINITY),
            Field::f64("mean", 0.25),
        ];

        let object = decode(&encoder.encode(&record(Level::FATAL, "m"), &fields).unwrap());
        assert_eq!(object["p99"], "NaN");
        assert_eq!(object["max"], "+Inf");
        assert_eq!(object["min"], "-Inf");
        assert_eq!(object["mean"], 0.25);
    }

    #[test]
    fn empty_stack_is_not_written() {
        let encoder = Encoder::new(EncoderConfig::default());
        let rec = Record::new(Level::ERROR, "m").with_time(fixed_time()).with_stack("");

        let object = decode(&encoder.encode(&rec, &[]).unwrap());
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["time", "severity", "message"]);
    }

    #[test]
    fn renders_structured_values() {
        #[derive(serde::Serialize)]
        struct Request {
            method: &'static str,
            status: u16,
        }

        let encoder = Encoder::new(EncoderConfig::default());
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let fields = [
            Field::i64("delta", -3),
            Field::bool("retry", false),
            Field::duration("elapsed", Duration::from_micros(1500)),
            Field::error("error", &io_err),
            Field::object("request", &Request { method: "GET", status: 200 }),
        ];

        let object = decode(&encoder.encode(&record(Level::WARN, "m"), &fields).unwrap());
        assert_eq!(object["delta"], -3);
        assert_eq!(object["retry"], false);
        assert_eq!(object["elapsed"], 1.5);
        assert_eq!(object["error"], "disk full");
        assert_eq!(object["request"], json!({"method": "GET", "status": 200}));
    }

    #[test]
    fn honours_encoder_options() {
        let config = EncoderConfig {
            line_ending: "\r\n".to_string(),
            time: TimeEncoding::Rfc3339Nano,
            duration: DurationEncoding::String,
            caller: CallerEncoding::Full,
        };
        let encoder = Encoder::new(config);
        let fields = [Field::duration("d", Duration::from_millis(1500))];
        let bytes = encoder.encode(&record(Level::DEBUG, "m"), &fields).unwrap();
        assert!(bytes.ends_with(b"\r\n"));

        let object = decode(&bytes);
        assert_eq!(object["time"], "2024-05-01T12:30:45.123456789Z");
        assert_eq!(object["caller"], "/home/build/app/src/handler.rs:42");
        assert_eq!(object["d"], "1.5s");
    }

    #[test]
    fn time_encodings() {
        let time = fixed_time();
        assert_eq!(TimeEncoding::Rfc3339.encode(time), "2024-05-01T12:30:45Z");

        let millis = TimeEncoding::EpochMillis.encode(time).as_f64().unwrap();
        assert!((millis - (time.timestamp_millis() as f64 + 0.456789)).abs() < 1e-3);

        let secs = TimeEncoding::EpochSeconds.encode(time).as_f64().unwrap();
        assert!((secs - time.timestamp() as f64 - 0.123456789).abs() < 1e-6);
    }

    #[test]
    fn duration_encodings() {
        let d = Duration::from_millis(2500);
        assert_eq!(DurationEncoding::Millis.encode(d), 2500.0);
        assert_eq!(DurationEncoding::Seconds.encode(d), 2.5);
        assert_eq!(DurationEncoding::Nanos.encode(d), 2_500_000_000u64);
    }

    #[test]
    fn short_caller_keeps_last_directory() {
        assert_eq!(CallerEncoding::Short.encode(&Caller::new("src/lib.rs", 1)), "src/lib.rs:1");
        assert_eq!(CallerEncoding::Short.encode(&Caller::new("lib.rs", 3)), "lib.rs:3");
        assert_eq!(CallerEncoding::Short.encode(&Caller::new("a\\b\\c.rs", 9)), "b\\c.rs:9");
    }
}
