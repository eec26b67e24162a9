/// A boxed error that can be carried across threads.
///
/// Used both for [`Payload::Exception`](crate::Payload::Exception) values and
/// for failures reported by an enrichment callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the target to the host pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured extra callback failed while enriching a record.
    ///
    /// The export of the current batch stops at the failing record.
    #[error("extra callback failed: {0}")]
    Callback(#[source] BoxError),

    /// A boolean option read from the environment could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidFlag {
        /// The environment variable that was read.
        name: &'static str,
        /// The raw value found in the environment.
        value: String,
    },

    /// A variable name pattern of the process context could not be compiled.
    #[error("invalid variable pattern")]
    InvalidPattern(#[from] regex::Error),
}
