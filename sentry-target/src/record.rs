use std::fmt;
use std::time::SystemTime;

use sentry::protocol::{Frame, Map, Value};

use crate::error::BoxError;

/// Severity of a [`LogRecord`] as assigned by the host logging pipeline.
///
/// The discriminants are the host's level ordinals. They are bit values so
/// that a host can combine them into level masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LogLevel {
    /// An error that needs attention.
    Error = 0x01,
    /// A condition that is unusual but not an error.
    Warning = 0x02,
    /// Informational messages.
    Info = 0x04,
    /// Tracing output, usually for debugging.
    Trace = 0x08,
    /// A profiling marker without a begin or end.
    Profile = 0x40,
    /// Start of a profiled block.
    ProfileBegin = 0x50,
    /// End of a profiled block.
    ProfileEnd = 0x60,
}

impl LogLevel {
    /// Looks up the level for a host ordinal.
    ///
    /// Returns `None` for ordinals the host does not define.
    pub fn from_ordinal(ordinal: u32) -> Option<LogLevel> {
        Some(match ordinal {
            0x01 => LogLevel::Error,
            0x02 => LogLevel::Warning,
            0x04 => LogLevel::Info,
            0x08 => LogLevel::Trace,
            0x40 => LogLevel::Profile,
            0x50 => LogLevel::ProfileBegin,
            0x60 => LogLevel::ProfileEnd,
            _ => return None,
        })
    }

    /// The host ordinal of this level.
    pub fn ordinal(self) -> u32 {
        self as u32
    }
}

/// The content of a [`LogRecord`].
///
/// Which variant a record carries is decided once, when the record is
/// created, and drives how the record is exported.
pub enum Payload {
    /// An error value. It is captured as an exception and bypasses all
    /// normalization.
    Exception(BoxError),
    /// A structured mapping. The `msg` and `tags` keys are interpreted, the
    /// remaining entries end up as extra data.
    Structured(Map<String, Value>),
    /// A plain text message.
    Plain(String),
}

impl Payload {
    /// Creates an exception payload from any error.
    pub fn exception<E>(err: E) -> Payload
    where
        E: Into<BoxError>,
    {
        Payload::Exception(err.into())
    }

    /// Returns `true` for [`Payload::Exception`].
    pub fn is_exception(&self) -> bool {
        matches!(self, Payload::Exception(_))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Exception(err) => f.debug_tuple("Exception").field(&err.to_string()).finish(),
            Payload::Structured(map) => f.debug_tuple("Structured").field(map).finish(),
            Payload::Plain(text) => f.debug_tuple("Plain").field(text).finish(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Plain(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Plain(text.to_owned())
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Structured(map)
    }
}

/// Objects become structured payloads. Strings stay plain text, any other
/// value is rendered as JSON and treated as plain text as well.
impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Payload::Structured(map.into_iter().collect()),
            Value::String(text) => Payload::Plain(text),
            other => Payload::Plain(other.to_string()),
        }
    }
}

/// A single entry handed over by the host logging pipeline.
#[derive(Debug)]
pub struct LogRecord {
    /// What was logged.
    pub payload: Payload,
    /// The host severity.
    pub level: LogLevel,
    /// Free-form category, usually the logging module or component.
    pub category: String,
    /// When the record was created.
    pub timestamp: SystemTime,
    /// Location frames recorded by the host, if any.
    pub traces: Vec<Frame>,
}

impl LogRecord {
    /// Creates a record timestamped with the current time.
    pub fn new<P, C>(payload: P, level: LogLevel, category: C) -> LogRecord
    where
        P: Into<Payload>,
        C: Into<String>,
    {
        LogRecord {
            payload: payload.into(),
            level,
            category: category.into(),
            timestamp: SystemTime::now(),
            traces: Vec::new(),
        }
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attaches location frames.
    #[must_use]
    pub fn with_traces(mut self, traces: Vec<Frame>) -> Self {
        self.traces = traces;
        self
    }
}

#[test]
fn test_level_ordinals() {
    for level in [
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Trace,
        LogLevel::Profile,
        LogLevel::ProfileBegin,
        LogLevel::ProfileEnd,
    ] {
        assert_eq!(LogLevel::from_ordinal(level.ordinal()), Some(level));
    }
    assert_eq!(LogLevel::from_ordinal(0x03), None);
    assert_eq!(LogLevel::from_ordinal(0), None);
}

#[test]
fn test_payload_from_value() {
    let payload = Payload::from(serde_json::json!({ "msg": "hi" }));
    assert!(matches!(payload, Payload::Structured(ref map) if map["msg"] == "hi"));

    let payload = Payload::from(serde_json::json!("plain"));
    assert!(matches!(payload, Payload::Plain(ref text) if text == "plain"));

    let payload = Payload::from(serde_json::json!([1, 2]));
    assert!(matches!(payload, Payload::Plain(ref text) if text == "[1,2]"));

    let payload = Payload::from(serde_json::json!(42));
    assert!(matches!(payload, Payload::Plain(ref text) if text == "42"));
}

#[test]
fn test_exception_payload() {
    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    let payload = Payload::exception(err);
    assert!(payload.is_exception());
    assert_eq!(format!("{:?}", payload), "Exception(\"disk on fire\")");
}
