use std::time::SystemTime;

use sentry::protocol::{Event, Map, Value};
use sentry::Level;

use crate::error::BoxError;
use crate::event::{Capture, NormalizedEvent};
use crate::record::{LogLevel, LogRecord, Payload};

/// Key of a structured payload that is used as the event message.
pub const MESSAGE_KEY: &str = "msg";
/// Key of a structured payload that is merged into the event tags.
pub const TAGS_KEY: &str = "tags";
/// Tag that carries the record category.
pub const CATEGORY_TAG: &str = "category";

/// Converts a host [`LogLevel`] to a Sentry [`Level`].
///
/// Levels without a dedicated Sentry severity are reported as errors.
pub fn convert_log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::Error,
        LogLevel::Warning => Level::Warning,
        LogLevel::Info => Level::Info,
        LogLevel::Trace | LogLevel::ProfileBegin | LogLevel::ProfileEnd => Level::Debug,
        _ => Level::Error,
    }
}

/// Converts a raw host level ordinal to a Sentry [`Level`].
///
/// Unknown ordinals are reported as errors.
pub fn convert_level_ordinal(ordinal: u32) -> Level {
    LogLevel::from_ordinal(ordinal).map_or(Level::Error, convert_log_level)
}

/// Returns the name of the Sentry severity for a host [`LogLevel`],
/// e.g. `"warning"`.
pub fn level_name(level: LogLevel) -> &'static str {
    match convert_log_level(level) {
        Level::Debug => "debug",
        Level::Info => "info",
        Level::Warning => "warning",
        Level::Error => "error",
        Level::Fatal => "fatal",
    }
}

/// Creates a [`NormalizedEvent`] from a structured payload.
///
/// A non-null `msg` entry becomes the message and a `tags` object is merged
/// over the default `category` tag. Both keys are removed, everything else
/// is kept as extra data.
pub fn event_from_structured(
    mut data: Map<String, Value>,
    level: LogLevel,
    category: String,
    timestamp: SystemTime,
) -> NormalizedEvent {
    let mut event = NormalizedEvent {
        level: Some(convert_log_level(level)),
        timestamp: Some(timestamp),
        ..Default::default()
    };
    event.tags.insert(CATEGORY_TAG.into(), category);

    if !matches!(data.get(MESSAGE_KEY), None | Some(Value::Null)) {
        event.message = data.remove(MESSAGE_KEY).map(value_to_string);
    }

    if matches!(data.get(TAGS_KEY), Some(Value::Object(_))) {
        if let Some(Value::Object(tags)) = data.remove(TAGS_KEY) {
            for (key, value) in tags {
                event.tags.insert(key, value_to_string(value));
            }
        }
    }

    event.extra = data;
    event
}

/// Creates a [`NormalizedEvent`] from a plain message.
///
/// Only the message is set. Level, timestamp and tags are left to the
/// client defaults.
pub fn event_from_plain(text: String) -> NormalizedEvent {
    NormalizedEvent::from_message(text)
}

/// Turns a [`LogRecord`] into what is handed to the extra callback.
///
/// Exceptions pass through untouched.
pub fn capture_from_record(record: LogRecord) -> Capture {
    match record.payload {
        Payload::Exception(err) => Capture::Exception(err),
        Payload::Structured(data) => Capture::Event(event_from_structured(
            data,
            record.level,
            record.category,
            record.timestamp,
        )),
        Payload::Plain(text) => Capture::Event(event_from_plain(text)),
    }
}

/// Creates an exception [`Event`] from an error value, including its chain
/// of sources.
pub fn event_from_exception(err: &BoxError) -> Event<'static> {
    sentry::event_from_error(&**err)
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn structured(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_convert_log_level() {
        assert_eq!(convert_log_level(LogLevel::Error), Level::Error);
        assert_eq!(convert_log_level(LogLevel::Warning), Level::Warning);
        assert_eq!(convert_log_level(LogLevel::Info), Level::Info);
        assert_eq!(convert_log_level(LogLevel::Trace), Level::Debug);
        assert_eq!(convert_log_level(LogLevel::ProfileBegin), Level::Debug);
        assert_eq!(convert_log_level(LogLevel::ProfileEnd), Level::Debug);
        assert_eq!(convert_log_level(LogLevel::Profile), Level::Error);
    }

    #[test]
    fn test_unknown_ordinals_are_errors() {
        assert_eq!(convert_level_ordinal(0x08), Level::Debug);
        for ordinal in [0, 0x03, 0x10, 0x80, u32::MAX] {
            assert_eq!(convert_level_ordinal(ordinal), Level::Error);
        }
    }

    #[test]
    fn test_level_name() {
        assert_eq!(level_name(LogLevel::Warning), "warning");
        assert_eq!(level_name(LogLevel::ProfileEnd), "debug");
        assert_eq!(level_name(LogLevel::Profile), "error");
    }

    #[test]
    fn test_msg_becomes_message() {
        let data = structured(json!({ "msg": "boom", "user_id": 42 }));
        let event = event_from_structured(data, LogLevel::Error, "app".into(), SystemTime::now());

        assert_eq!(event.message.as_deref(), Some("boom"));
        assert!(!event.extra.contains_key("msg"));
        assert_eq!(event.extra["user_id"], 42);
    }

    #[test]
    fn test_non_string_msg_is_rendered() {
        let data = structured(json!({ "msg": { "code": 7 } }));
        let event = event_from_structured(data, LogLevel::Info, "app".into(), SystemTime::now());
        assert_eq!(event.message.as_deref(), Some(r#"{"code":7}"#));
    }

    #[test]
    fn test_null_msg_stays_in_extra() {
        let data = structured(json!({ "msg": null }));
        let event = event_from_structured(data, LogLevel::Info, "app".into(), SystemTime::now());
        assert_eq!(event.message, None);
        assert_eq!(event.extra["msg"], Value::Null);
    }

    #[test]
    fn test_tags_are_merged() {
        let data = structured(json!({
            "tags": { "user": "42", "category": "override", "attempt": 3 },
            "path": "/login",
        }));
        let event = event_from_structured(data, LogLevel::Warning, "app".into(), SystemTime::now());

        assert_eq!(event.tags.len(), 3);
        assert_eq!(event.tags["category"], "override");
        assert_eq!(event.tags["user"], "42");
        assert_eq!(event.tags["attempt"], "3");
        assert!(!event.extra.contains_key("tags"));
        assert_eq!(event.extra["path"], "/login");
    }

    #[test]
    fn test_non_object_tags_stay_in_extra() {
        let data = structured(json!({ "tags": "not-a-map" }));
        let event = event_from_structured(data, LogLevel::Info, "app".into(), SystemTime::now());
        assert_eq!(event.tags.len(), 1);
        assert_eq!(event.tags["category"], "app");
        assert_eq!(event.extra["tags"], "not-a-map");
    }

    #[test]
    fn test_structured_event_shape() {
        let timestamp = SystemTime::now();
        let data = structured(json!({}));
        let event = event_from_structured(data, LogLevel::Trace, "db".into(), timestamp);

        assert_eq!(event.level, Some(Level::Debug));
        assert_eq!(event.timestamp, Some(timestamp));
        assert_eq!(event.message, None);
        assert_eq!(event.tags["category"], "db");
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_plain_event_shape() {
        let capture = capture_from_record(LogRecord::new("hello", LogLevel::Error, "app"));
        let event = capture.event().unwrap();

        assert_eq!(event.message.as_deref(), Some("hello"));
        assert_eq!(event.level, None);
        assert_eq!(event.timestamp, None);
        assert!(event.tags.is_empty());
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_exception_passes_through() {
        let record = LogRecord::new(Payload::exception("boom"), LogLevel::Info, "app");
        match capture_from_record(record) {
            Capture::Exception(err) => assert_eq!(err.to_string(), "boom"),
            Capture::Event(_) => panic!("exceptions must not be normalized"),
        }
    }

    #[test]
    fn test_event_from_exception() {
        let err: BoxError = Box::new(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let event = event_from_exception(&err);

        assert_eq!(event.level, Level::Error);
        assert_eq!(event.exception.len(), 1);
        assert_eq!(event.exception[0].value.as_deref(), Some("disk on fire"));
    }
}
