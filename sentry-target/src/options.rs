use std::borrow::Cow;
use std::env;
use std::fmt;
use std::sync::Arc;

use sentry::ClientOptions;

use crate::context::{ContextSource, ProcessContext};
use crate::error::{BoxError, Error};
use crate::event::Capture;

/// Environment variable holding the DSN.
pub const DSN_VAR: &str = "SENTRY_DSN";
/// Environment variable toggling the context dump.
pub const CONTEXT_VAR: &str = "SENTRY_TARGET_CONTEXT";
/// Environment variable toggling stack trace attachment.
pub const STACKTRACE_VAR: &str = "SENTRY_TARGET_STACKTRACE";
/// Environment variable naming the runtime environment.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Callback that may modify or replace each capture before it is sent.
///
/// Returning an error aborts the export of the current batch.
pub type ExtraCallback = Arc<dyn Fn(Capture) -> Result<Capture, BoxError> + Send + Sync>;

/// Configuration of a [`SentryTarget`](crate::SentryTarget).
///
/// The target owns its options and never changes them after creation.
#[derive(Clone)]
pub struct TargetOptions {
    /// The DSN events are sent to. An empty or invalid DSN disables sending.
    pub dsn: String,
    /// Options for the client. `dsn`, `attach_stacktrace` and `environment`
    /// are always overridden by the target's own settings.
    pub client_options: ClientOptions,
    /// Attach the context dump as `extra.context` (defaults to `true`).
    pub context: bool,
    /// Let the client attach stack traces to events (defaults to `true`).
    pub stacktrace: bool,
    /// The runtime environment reported with every event.
    pub environment: Cow<'static, str>,
    /// Optional enrichment callback.
    pub extra_callback: Option<ExtraCallback>,
    /// Where the context dump comes from. Defaults to a [`ProcessContext`]
    /// that only sends variable values if `client_options.send_default_pii`
    /// is set.
    pub context_source: Option<Arc<dyn ContextSource>>,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            client_options: ClientOptions::default(),
            context: true,
            stacktrace: true,
            environment: runtime_environment(),
            extra_callback: None,
            context_source: None,
        }
    }
}

impl fmt::Debug for TargetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct ExtraCallback;
        let extra_callback = self.extra_callback.as_ref().map(|_| ExtraCallback);

        f.debug_struct("TargetOptions")
            .field("dsn", &self.dsn)
            .field("client_options", &self.client_options)
            .field("context", &self.context)
            .field("stacktrace", &self.stacktrace)
            .field("environment", &self.environment)
            .field("extra_callback", &extra_callback)
            .finish()
    }
}

impl TargetOptions {
    /// Creates options for the given DSN with default settings.
    pub fn new<S: Into<String>>(dsn: S) -> Self {
        Self {
            dsn: dsn.into(),
            ..Default::default()
        }
    }

    /// Reads the options from the process environment.
    ///
    /// See [`DSN_VAR`], [`CONTEXT_VAR`], [`STACKTRACE_VAR`] and
    /// [`ENVIRONMENT_VAR`]. Flags accept `1`, `true`, `yes`, `on` and
    /// `0`, `false`, `no`, `off`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::new(lookup(DSN_VAR).unwrap_or_default());
        if let Some(value) = lookup(CONTEXT_VAR) {
            options.context = parse_flag(CONTEXT_VAR, value)?;
        }
        if let Some(value) = lookup(STACKTRACE_VAR) {
            options.stacktrace = parse_flag(STACKTRACE_VAR, value)?;
        }
        if let Some(value) = lookup(ENVIRONMENT_VAR) {
            options.environment = value.into();
        }
        Ok(options)
    }

    /// Sets the client options.
    #[must_use]
    pub fn client_options(mut self, client_options: ClientOptions) -> Self {
        self.client_options = client_options;
        self
    }

    /// Enables or disables the context dump.
    #[must_use]
    pub fn context(mut self, context: bool) -> Self {
        self.context = context;
        self
    }

    /// Enables or disables stack trace attachment.
    #[must_use]
    pub fn stacktrace(mut self, stacktrace: bool) -> Self {
        self.stacktrace = stacktrace;
        self
    }

    /// Sets the runtime environment.
    #[must_use]
    pub fn environment<E: Into<Cow<'static, str>>>(mut self, environment: E) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the extra callback.
    ///
    /// The callback sees every record after normalization, exceptions
    /// included, and returns what is actually sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use sentry_target::{Capture, TargetOptions};
    ///
    /// let options = TargetOptions::new("").extra_callback(|mut capture| {
    ///     if let Capture::Event(event) = &mut capture {
    ///         event.extra.insert("service".into(), "billing".into());
    ///     }
    ///     Ok(capture)
    /// });
    /// ```
    #[must_use]
    pub fn extra_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Capture) -> Result<Capture, BoxError> + Send + Sync + 'static,
    {
        self.extra_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the source of the context dump.
    #[must_use]
    pub fn context_source<C>(mut self, source: C) -> Self
    where
        C: ContextSource + 'static,
    {
        self.context_source = Some(Arc::new(source));
        self
    }

    pub(crate) fn resolve_context_source(&self) -> Arc<dyn ContextSource> {
        match self.context_source {
            Some(ref source) => source.clone(),
            None => Arc::new(
                ProcessContext::new().send_default_pii(self.client_options.send_default_pii),
            ),
        }
    }
}

/// The name of the environment the process runs in.
///
/// Taken from `APP_ENV`, otherwise `"debug"` or `"release"` depending on
/// the build profile.
pub fn runtime_environment() -> Cow<'static, str> {
    env::var(ENVIRONMENT_VAR)
        .ok()
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed(if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        }))
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidFlag { name, value }),
    }
}
