use serde::Serialize;
use std::error::Error;
use std::time::Duration;

/// A structured key/value pair attached to a log call or to a derived core.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

/// Value half of a [`Field`].
///
/// Values are kept in their typed form until the encoder renders them, so
/// that duration rendering follows the active encoder configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Duration(Duration),
    /// Display text of an error value.
    Error(String),
    Json(serde_json::Value),
    /// An object whose serialization failed when the field was built.
    Unserializable(String),
}

impl Field {
    pub fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Field { key: key.into(), value }
    }

    pub fn str(key: impl Into<String>, value: impl Into<String>) -> Self {
        Field::new(key, FieldValue::Str(value.into()))
    }

    pub fn i64(key: impl Into<String>, value: i64) -> Self {
        Field::new(key, FieldValue::I64(value))
    }

    pub fn u64(key: impl Into<String>, value: u64) -> Self {
        Field::new(key, FieldValue::U64(value))
    }

    pub fn f64(key: impl Into<String>, value: f64) -> Self {
        Field::new(key, FieldValue::F64(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Field::new(key, FieldValue::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Field::new(key, FieldValue::Duration(value))
    }

    /// Attach an error under `key`, rendered with its `Display` text.
    pub fn error(key: impl Into<String>, err: &(dyn Error + 'static)) -> Self {
        Field::new(key, FieldValue::Error(err.to_string()))
    }

    pub fn json(key: impl Into<String>, value: serde_json::Value) -> Self {
        Field::new(key, FieldValue::Json(value))
    }

    /// Attach any serializable value as a nested object.
    ///
    /// A serialization failure is not reported here; it is kept in the field
    /// and surfaces as an [`EncodeError`](crate::error::EncodeError) when the
    /// field is encoded.
    pub fn object<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Field::new(key, FieldValue::Json(json)),
            Err(e) => Field::new(key, FieldValue::Unserializable(e.to_string())),
        }
    }
}
