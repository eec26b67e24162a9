//! A log target that forwards batches of log records to Sentry.
//!
//! A host logging pipeline hands batches of [`LogRecord`]s to
//! [`Target::collect`]. The [`SentryTarget`] turns each record into exactly
//! one Sentry capture:
//!
//! * error values are captured as exceptions, untouched,
//! * structured payloads become events with a level, a timestamp and a
//!   `category` tag, where the `msg` entry is the message, the `tags` entry
//!   is merged into the tags and everything else ends up in `extra`,
//! * plain text becomes the message of an otherwise empty event.
//!
//! Events can additionally receive a context dump of the host process, and
//! every capture passes through an optional extra callback before it is
//! sent.
//!
//! The Sentry client is created lazily from the [`TargetOptions`] when the
//! first batch arrives.
//!
//! # Examples
//!
//! ```no_run
//! use sentry_target::{Capture, LogLevel, LogRecord, Payload, SentryTarget, Target, TargetOptions};
//!
//! let options = TargetOptions::new("https://public@sentry.invalid/1")
//!     .context(false)
//!     .extra_callback(|mut capture| {
//!         if let Capture::Event(event) = &mut capture {
//!             event.tags.insert("service".into(), "checkout".into());
//!         }
//!         Ok(capture)
//!     });
//! let target = SentryTarget::new(options);
//!
//! let records = vec![
//!     LogRecord::new(
//!         serde_json::json!({ "msg": "card declined", "tags": { "psp": "acme" }, "amount": 1200 }),
//!         LogLevel::Warning,
//!         "payments",
//!     ),
//!     LogRecord::new("checkout finished", LogLevel::Info, "payments"),
//!     LogRecord::new(
//!         Payload::exception(std::io::Error::new(std::io::ErrorKind::Other, "gateway timeout")),
//!         LogLevel::Error,
//!         "payments",
//!     ),
//! ];
//! target.collect(records, true).unwrap();
//! ```
//!
//! Applications using the `log` crate can install a [`TargetLogger`]
//! instead of running their own pipeline.

#![doc(html_favicon_url = "https://sentry-brand.storage.googleapis.com/favicon.ico")]
#![doc(html_logo_url = "https://sentry-brand.storage.googleapis.com/sentry-glyph-black.png")]
#![warn(missing_docs)]
#![deny(unsafe_code)]

mod context;
mod converters;
mod error;
mod event;
mod logger;
mod options;
mod record;
mod target;

pub use context::{ContextSource, ProcessContext, StaticContext, DEFAULT_MASK_VARS, MASK};
pub use converters::{
    capture_from_record, convert_level_ordinal, convert_log_level, event_from_exception,
    event_from_plain, event_from_structured, level_name, CATEGORY_TAG, MESSAGE_KEY, TAGS_KEY,
};
pub use error::{BoxError, Error};
pub use event::{Capture, NormalizedEvent};
pub use logger::{record_from_log, TargetLogger, IGNORED_TARGETS};
pub use options::{
    runtime_environment, ExtraCallback, TargetOptions, CONTEXT_VAR, DSN_VAR, ENVIRONMENT_VAR,
    STACKTRACE_VAR,
};
pub use record::{LogLevel, LogRecord, Payload};
pub use target::{SentryTarget, Target, CONTEXT_KEY};
