use std::sync::Arc;

use log::kv::{self, Source, VisitSource};
use sentry::protocol::{Frame, Map, Value};

use crate::converters::MESSAGE_KEY;
use crate::record::{LogLevel, LogRecord, Payload};
use crate::target::Target;

/// Converts a [`log::Level`] to a host [`LogLevel`].
pub fn convert_log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warning,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug | log::Level::Trace => LogLevel::Trace,
    }
}

/// Creates a [`LogRecord`] from a given [`log::Record`].
///
/// The payload is structured: the formatted message is stored under `msg`
/// next to the record's key-values. The record location becomes the only
/// trace frame.
pub fn record_from_log(record: &log::Record<'_>) -> LogRecord {
    let mut data = Map::new();
    let mut visitor = FieldVisitor { data: &mut data };
    if let Err(err) = record.key_values().visit(&mut visitor) {
        eprintln!("failed to read log record key-values: {}", err);
    }
    data.insert(MESSAGE_KEY.into(), Value::String(record.args().to_string()));

    let frame = Frame {
        module: record.module_path().map(ToOwned::to_owned),
        filename: record.file().map(ToOwned::to_owned),
        lineno: record.line().map(Into::into),
        ..Default::default()
    };

    LogRecord::new(
        Payload::Structured(data),
        convert_log_level(record.level()),
        record.target(),
    )
    .with_traces(vec![frame])
}

struct FieldVisitor<'a> {
    data: &'a mut Map<String, Value>,
}

impl<'kvs> VisitSource<'kvs> for FieldVisitor<'_> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        let value = if let Some(value) = value.to_bool() {
            Value::from(value)
        } else if let Some(value) = value.to_i64() {
            Value::from(value)
        } else if let Some(value) = value.to_u64() {
            Value::from(value)
        } else if let Some(value) = value.to_f64() {
            Value::from(value)
        } else {
            Value::String(value.to_string())
        };
        self.data.insert(key.as_str().to_owned(), value);
        Ok(())
    }
}

/// Crates whose records are never forwarded: the SDK itself and the HTTP
/// stack its transport is built on. `name_*` crates are included.
pub const IGNORED_TARGETS: &[&str] = &[
    "sentry",
    "reqwest",
    "hyper",
    "h2",
    "rustls",
    "native_tls",
    "tokio",
    "mio",
    "want",
];

fn is_ignored(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    IGNORED_TARGETS.iter().any(|ignored| {
        krate
            .strip_prefix(*ignored)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
    })
}

/// A [`log::Log`] implementation that forwards records to a [`Target`].
///
/// Every enabled record is exported right away as a batch of one. Records
/// from [`IGNORED_TARGETS`] are never forwarded.
///
/// # Examples
///
/// ```
/// use sentry_target::{SentryTarget, TargetLogger, TargetOptions};
///
/// let target = SentryTarget::new(TargetOptions::new(""));
/// let logger = TargetLogger::new(target).filter(log::LevelFilter::Warn);
/// log::set_boxed_logger(Box::new(logger)).ok();
/// log::set_max_level(log::LevelFilter::Warn);
///
/// log::warn!("cache miss rate above threshold");
/// ```
pub struct TargetLogger<T> {
    target: Arc<T>,
    filter: log::LevelFilter,
    dest_log: Option<Box<dyn log::Log>>,
}

impl<T: Target> TargetLogger<T> {
    /// Creates a logger forwarding `Error` records.
    pub fn new(target: T) -> Self {
        Self::from_shared(Arc::new(target))
    }

    /// Creates a logger for a target that is shared with other pipelines.
    pub fn from_shared(target: Arc<T>) -> Self {
        Self {
            target,
            filter: log::LevelFilter::Error,
            dest_log: None,
        }
    }

    /// Sets the maximum level that is forwarded.
    #[must_use]
    pub fn filter(mut self, filter: log::LevelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets a logger that receives every record as well, e.g. a console
    /// logger.
    #[must_use]
    pub fn dest_log<L: log::Log + 'static>(mut self, dest_log: L) -> Self {
        self.dest_log = Some(Box::new(dest_log));
        self
    }

    /// The target records are forwarded to.
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    fn forwards(&self, md: &log::Metadata<'_>) -> bool {
        md.level() <= self.filter && !is_ignored(md.target())
    }
}

impl<T: Target> log::Log for TargetLogger<T> {
    fn enabled(&self, md: &log::Metadata<'_>) -> bool {
        self.forwards(md) || self.dest_log.as_ref().is_some_and(|log| log.enabled(md))
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.forwards(record.metadata()) {
            if let Err(err) = self.target.collect(vec![record_from_log(record)], false) {
                eprintln!("failed to forward log record: {}", err);
            }
        }
        if let Some(ref log) = self.dest_log {
            if log.enabled(record.metadata()) {
                log.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(ref log) = self.dest_log {
            log.flush();
        }
    }
}
