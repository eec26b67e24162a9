use std::time::SystemTime;

use sentry::protocol::{Event, Map, Value};
use sentry::Level;

use crate::error::BoxError;

/// The canonical shape a record is normalized into before it is sent.
///
/// Fields that are `None` or empty are left to the client's defaults when
/// the event is converted into a Sentry [`Event`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedEvent {
    /// The Sentry severity.
    pub level: Option<Level>,
    /// When the underlying record was logged.
    pub timestamp: Option<SystemTime>,
    /// The message text.
    pub message: Option<String>,
    /// Indexed tags. Structured records always carry a `category` tag.
    pub tags: Map<String, String>,
    /// Arbitrary additional data.
    pub extra: Map<String, Value>,
}

impl NormalizedEvent {
    /// Creates an event that only carries a message.
    pub fn from_message<S: Into<String>>(message: S) -> Self {
        NormalizedEvent {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Converts into a Sentry protocol [`Event`].
    pub fn into_event(self) -> Event<'static> {
        let mut event = Event {
            message: self.message,
            tags: self.tags,
            extra: self.extra,
            ..Default::default()
        };
        if let Some(level) = self.level {
            event.level = level;
        }
        if let Some(timestamp) = self.timestamp {
            event.timestamp = timestamp;
        }
        event
    }
}

impl From<NormalizedEvent> for Event<'static> {
    fn from(event: NormalizedEvent) -> Self {
        event.into_event()
    }
}

/// What the extra callback receives and returns for each record.
#[derive(Debug)]
pub enum Capture {
    /// An error value, captured as an exception.
    Exception(BoxError),
    /// A normalized event, captured as a message event.
    Event(NormalizedEvent),
}

impl Capture {
    /// Returns the normalized event, if this is not an exception.
    pub fn event(&self) -> Option<&NormalizedEvent> {
        match self {
            Capture::Event(event) => Some(event),
            Capture::Exception(_) => None,
        }
    }

    /// Mutable access to the normalized event, if this is not an exception.
    pub fn event_mut(&mut self) -> Option<&mut NormalizedEvent> {
        match self {
            Capture::Event(event) => Some(event),
            Capture::Exception(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_into_event_keeps_client_defaults() {
        let event = NormalizedEvent::from_message("hello").into_event();
        assert_eq!(event.message.as_deref(), Some("hello"));
        assert_eq!(event.level, Level::Error);
        assert!(event.tags.is_empty());
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_into_event_copies_fields() {
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let mut normalized = NormalizedEvent {
            level: Some(Level::Warning),
            timestamp: Some(timestamp),
            message: Some("disk almost full".into()),
            ..Default::default()
        };
        normalized.tags.insert("category".into(), "storage".into());
        normalized.extra.insert("free_bytes".into(), 1024.into());

        let event: Event<'static> = normalized.into();
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.timestamp, timestamp);
        assert_eq!(event.tags["category"], "storage");
        assert_eq!(event.extra["free_bytes"], 1024);
    }

    #[test]
    fn test_capture_accessors() {
        let mut capture = Capture::Event(NormalizedEvent::from_message("hi"));
        if let Some(event) = capture.event_mut() {
            event.extra.insert("seen".into(), true.into());
        }
        assert_eq!(capture.event().unwrap().extra["seen"], true);

        let mut capture = Capture::Exception("boom".into());
        assert!(capture.event().is_none());
        assert!(capture.event_mut().is_none());
    }
}
