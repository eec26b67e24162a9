use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use sentry::protocol::{Event, Value};
use sentry::types::{Dsn, Uuid};
use sentry::Client;

use crate::context::ContextSource;
use crate::converters::{capture_from_record, event_from_exception};
use crate::error::{BoxError, Error};
use crate::event::{Capture, NormalizedEvent};
use crate::options::TargetOptions;
use crate::record::LogRecord;

/// Key of the extra entry holding the context dump.
pub const CONTEXT_KEY: &str = "context";

/// A destination of the host logging pipeline.
///
/// The pipeline hands over batches of records. `is_final` marks the last
/// batch before the pipeline shuts down.
pub trait Target: Send + Sync {
    /// Receives a batch of records.
    fn collect(&self, records: Vec<LogRecord>, is_final: bool) -> Result<(), Error>;
}

/// Sends log records to Sentry.
///
/// The [`Client`] is created on first use from the [`TargetOptions`] and
/// kept for the lifetime of the target.
///
/// # Examples
///
/// ```
/// use sentry_target::{LogLevel, LogRecord, SentryTarget, Target, TargetOptions};
///
/// let target = SentryTarget::new(TargetOptions::new("").context(false));
/// let record = LogRecord::new(
///     serde_json::json!({ "msg": "payment declined", "order": 17 }),
///     LogLevel::Warning,
///     "billing",
/// );
/// target.collect(vec![record], false).unwrap();
/// ```
pub struct SentryTarget {
    options: TargetOptions,
    context_source: Arc<dyn ContextSource>,
    client: OnceLock<Arc<Client>>,
}

impl fmt::Debug for SentryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryTarget")
            .field("options", &self.options)
            .field("client", &self.client)
            .finish()
    }
}

impl SentryTarget {
    /// Creates a target. No client is created until the first batch.
    pub fn new(options: TargetOptions) -> Self {
        Self {
            context_source: options.resolve_context_source(),
            options,
            client: OnceLock::new(),
        }
    }

    /// The options of this target.
    pub fn options(&self) -> &TargetOptions {
        &self.options
    }

    /// Returns the client, creating it on the first call.
    ///
    /// The `dsn`, `attach_stacktrace` and `environment` client options are
    /// taken from the target options, everything else from
    /// [`TargetOptions::client_options`] with the SDK defaults applied.
    /// Concurrent callers always observe the same client.
    pub fn ensure_client(&self) -> &Arc<Client> {
        self.client.get_or_init(|| Arc::new(self.create_client()))
    }

    fn create_client(&self) -> Client {
        let mut client_options = sentry::apply_defaults(self.options.client_options.clone());
        client_options.dsn = parse_dsn(&self.options.dsn);
        client_options.attach_stacktrace = self.options.stacktrace;
        client_options.environment = Some(self.options.environment.clone());

        log::debug!(
            "creating sentry client (environment: {}, enabled: {})",
            self.options.environment,
            client_options.dsn.is_some()
        );
        Client::from_config(client_options)
    }

    /// Exports a batch of records in order.
    ///
    /// Exceptions are captured as they are. All other records are normalized,
    /// get the context dump attached if enabled, and are captured as events.
    /// Every record passes through the extra callback first.
    ///
    /// Stops at the first record whose callback fails.
    pub fn export(&self, records: Vec<LogRecord>) -> Result<(), Error> {
        for record in records {
            let mut capture = capture_from_record(record);
            if let Capture::Event(ref mut event) = capture {
                if self.options.context {
                    event.extra.insert(CONTEXT_KEY.into(), self.context_message());
                }
            }

            match self.run_extra_callback(capture)? {
                Capture::Exception(err) => {
                    self.capture_exception(&err);
                }
                Capture::Event(event) => {
                    self.capture_event(event);
                }
            }
        }
        Ok(())
    }

    /// Runs the configured extra callback, if any.
    pub fn run_extra_callback(&self, capture: Capture) -> Result<Capture, Error> {
        match self.options.extra_callback {
            Some(ref callback) => callback(capture).map_err(Error::Callback),
            None => Ok(capture),
        }
    }

    /// Captures an error value as an exception event.
    pub fn capture_exception(&self, err: &BoxError) -> Uuid {
        self.send(event_from_exception(err))
    }

    /// Captures a normalized event.
    pub fn capture_event(&self, event: NormalizedEvent) -> Uuid {
        self.send(event.into_event())
    }

    /// Waits up to `timeout` for queued events to be sent.
    ///
    /// Returns `true` if the queue was drained. A target without a client
    /// has nothing to flush.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        self.client.get().map_or(true, |client| client.flush(timeout))
    }

    fn send(&self, event: Event<'static>) -> Uuid {
        let event_id = self.ensure_client().capture_event(event, None);
        log::debug!("captured event {}", event_id);
        event_id
    }

    fn context_message(&self) -> Value {
        self.context_source.context_message()
    }
}

impl Target for SentryTarget {
    fn collect(&self, records: Vec<LogRecord>, is_final: bool) -> Result<(), Error> {
        self.ensure_client();
        self.export(records)?;
        if is_final {
            self.flush(None);
        }
        Ok(())
    }
}

fn parse_dsn(dsn: &str) -> Option<Dsn> {
    if dsn.is_empty() {
        return None;
    }
    match dsn.parse() {
        Ok(dsn) => Some(dsn),
        Err(err) => {
            log::warn!("invalid sentry DSN, events will not be sent: {}", err);
            None
        }
    }
}

#[test]
fn test_parse_dsn() {
    assert!(parse_dsn("").is_none());
    assert!(parse_dsn("not a dsn").is_none());
    let dsn = parse_dsn("https://public@sentry.invalid/1").unwrap();
    assert_eq!(dsn.public_key(), "public");
}
