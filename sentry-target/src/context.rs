//! Host context attached to exported events.
//!
//! When context is enabled on a [`SentryTarget`](crate::SentryTarget), every
//! non-exception event receives an `extra.context` entry produced by a
//! [`ContextSource`].

use std::env;

use once_cell::sync::Lazy;
use regex::{RegexSet, RegexSetBuilder};
use sentry::protocol::{Map, Value};

use crate::error::Error;

/// Replacement for the values of masked variables.
pub const MASK: &str = "***";

/// Produces the ambient context dump that is attached to events.
pub trait ContextSource: Send + Sync {
    /// Returns the current context.
    fn context_message(&self) -> Value;
}

impl<F> ContextSource for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn context_message(&self) -> Value {
        self()
    }
}

/// A context source that always returns the same value.
#[derive(Clone, Debug, Default)]
pub struct StaticContext(pub Value);

impl ContextSource for StaticContext {
    fn context_message(&self) -> Value {
        self.0.clone()
    }
}

/// Environment variables whose values are masked by default.
pub const DEFAULT_MASK_VARS: &[&str] = &[
    "*PASS*",
    "*SECRET*",
    "*TOKEN*",
    "*CREDENTIAL*",
    "*AUTH*",
    "*DSN*",
    "*URL*",
    "*_KEY",
    "*_KEY_*",
    "*_ID",
];

static ALL_VARS: Lazy<RegexSet> = Lazy::new(|| compile_patterns(["*"]).unwrap());
static MASKED_VARS: Lazy<RegexSet> =
    Lazy::new(|| compile_patterns(DEFAULT_MASK_VARS.iter().copied()).unwrap());

/// Dumps the state of the current process.
///
/// The dump is an object with the process id, the command line arguments
/// and the environment variables selected by [`log_vars`](Self::log_vars).
///
/// Unless [`send_default_pii`](Self::send_default_pii) is enabled, every
/// variable value is replaced by `"***"` and only the names are sent.
/// Otherwise only variables matched by [`mask_vars`](Self::mask_vars) are
/// masked.
///
/// Patterns are matched case-insensitively against the whole name and may
/// use `*` as a wildcard.
#[derive(Clone, Debug)]
pub struct ProcessContext {
    log_vars: RegexSet,
    mask_vars: RegexSet,
    send_default_pii: bool,
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self {
            log_vars: RegexSet::clone(&ALL_VARS),
            mask_vars: RegexSet::clone(&MASKED_VARS),
            send_default_pii: false,
        }
    }
}

impl ProcessContext {
    /// Creates a context source with the default selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the patterns of environment variables to include.
    ///
    /// An empty list excludes the environment entirely.
    pub fn log_vars<I, S>(mut self, patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.log_vars = compile_patterns(patterns)?;
        Ok(self)
    }

    /// Sets the patterns of environment variables whose values are masked.
    ///
    /// Replaces [`DEFAULT_MASK_VARS`].
    pub fn mask_vars<I, S>(mut self, patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.mask_vars = compile_patterns(patterns)?;
        Ok(self)
    }

    /// Sends the values of variables not matched by `mask_vars`.
    ///
    /// [`SentryTarget`](crate::SentryTarget) takes this from
    /// `ClientOptions::send_default_pii` for its default context.
    #[must_use]
    pub fn send_default_pii(mut self, send_default_pii: bool) -> Self {
        self.send_default_pii = send_default_pii;
        self
    }

    fn env_from<I>(&self, vars: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter(|(name, _)| self.log_vars.is_match(name))
            .map(|(name, value)| {
                let value = if !self.send_default_pii || self.mask_vars.is_match(&name) {
                    MASK.to_owned()
                } else {
                    value
                };
                (name, Value::String(value))
            })
            .collect()
    }
}

impl ContextSource for ProcessContext {
    fn context_message(&self) -> Value {
        let mut dump = serde_json::Map::new();
        dump.insert("pid".into(), std::process::id().into());
        dump.insert(
            "args".into(),
            env::args_os()
                .map(|arg| Value::String(arg.to_string_lossy().into_owned()))
                .collect(),
        );
        let vars = self.env_from(env::vars_os().map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        }));
        dump.insert("env".into(), Value::Object(vars.into_iter().collect()));
        Value::Object(dump)
    }
}

/// Compiles `*` wildcard patterns into an anchored, case-insensitive set.
fn compile_patterns<I, S>(patterns: I) -> Result<RegexSet, regex::Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let patterns = patterns.into_iter().map(|pattern| {
        let parts: Vec<String> = pattern.as_ref().split('*').map(regex::escape).collect();
        format!("^{}$", parts.join(".*"))
    });
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect()
    }

    fn matches(pattern: &str, name: &str) -> bool {
        compile_patterns([pattern]).unwrap().is_match(name)
    }

    #[test]
    fn test_compile_patterns() {
        assert!(matches("*", "ANYTHING"));
        assert!(matches("*", ""));
        assert!(matches("HTTP_*", "HTTP_HOST"));
        assert!(matches("http_*", "HTTP_HOST"));
        assert!(matches("*PASSWORD*", "DB_PASSWORD_FILE"));
        assert!(matches("*_KEY", "API_KEY"));
        assert!(!matches("*_KEY", "API_KEYS"));
        assert!(!matches("HOME", "HOMEPATH"));
        assert!(matches("a*b*c", "aXXbYYbc"));
        assert!(matches("APP.NAME", "app.name"));
        assert!(!matches("APP.NAME", "APP_NAME"));
        assert!(!matches("(*)", "X"));
    }

    #[test]
    fn test_env_selection_and_masking() {
        let context = ProcessContext::new()
            .log_vars(["APP_*", "HOME"])
            .unwrap()
            .send_default_pii(true);
        let env = context.env_from(vars(&[
            ("APP_NAME", "shop"),
            ("APP_DB_PASSWORD", "hunter2"),
            ("HOME", "/root"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(env.len(), 3);
        assert_eq!(env["APP_NAME"], "shop");
        assert_eq!(env["APP_DB_PASSWORD"], MASK);
        assert_eq!(env["HOME"], "/root");
        assert!(!env.contains_key("PATH"));
    }

    #[test]
    fn test_default_masks_credentials() {
        let credentials = vars(&[
            ("DATABASE_URL", "postgres://app:hunter2@db/prod"),
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI"),
            ("GITHUB_TOKEN", "ghp_example"),
            ("PGPASSFILE", "/root/.pgpass"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/gcp.json"),
            ("HTTP_AUTHORIZATION", "Bearer abc"),
            ("STRIPE_KEY_LIVE", "sk_live_example"),
        ]);

        let env = ProcessContext::new()
            .send_default_pii(true)
            .env_from(credentials.clone());
        assert_eq!(env.len(), credentials.len());
        for (name, value) in &env {
            assert_eq!(value, MASK, "{} is not masked", name);
        }

        let env = ProcessContext::new()
            .send_default_pii(true)
            .env_from(vars(&[("HOME", "/root"), ("LANG", "C.UTF-8")]));
        assert_eq!(env["HOME"], "/root");
        assert_eq!(env["LANG"], "C.UTF-8");
    }

    #[test]
    fn test_values_are_masked_without_pii() {
        let env = ProcessContext::new().env_from(vars(&[
            ("HOME", "/root"),
            ("DATABASE_URL", "postgres://app:hunter2@db/prod"),
        ]));

        assert_eq!(env.len(), 2);
        assert_eq!(env["HOME"], MASK);
        assert_eq!(env["DATABASE_URL"], MASK);
    }

    #[test]
    fn test_custom_mask_vars_replace_defaults() {
        let env = ProcessContext::new()
            .mask_vars(["internal_*"])
            .unwrap()
            .send_default_pii(true)
            .env_from(vars(&[("INTERNAL_HOST", "10.0.0.1"), ("API_KEY", "abc")]));

        assert_eq!(env["INTERNAL_HOST"], MASK);
        assert_eq!(env["API_KEY"], "abc");
    }

    #[test]
    fn test_empty_log_vars_excludes_env() {
        let context = ProcessContext::new()
            .log_vars(Vec::<String>::new())
            .unwrap();
        assert!(context.env_from(vars(&[("HOME", "/root")])).is_empty());
    }

    #[test]
    fn test_process_dump_shape() {
        let dump = ProcessContext::new().context_message();
        assert_eq!(dump["pid"], std::process::id());
        assert!(dump["args"].is_array());
        let env = dump["env"].as_object().unwrap();
        assert!(env.values().all(|value| value == MASK));
    }

    #[test]
    fn test_closure_and_static_sources() {
        let source = || Value::from("from closure");
        assert_eq!(source.context_message(), "from closure");

        let source = StaticContext(Value::from("fixed"));
        assert_eq!(source.context_message(), "fixed");
    }
}
