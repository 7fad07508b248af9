use camino::Utf8PathBuf;
use thiserror::Error;

/// Problems that stop an operation from being assembled.
///
/// None of these leave any store modified: building happens before anything
/// is recorded or sent.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Execute was requested while the query page has no operation selected
    #[error("no operation is selected")]
    NoOperationSelected,

    /// A date range was chosen but the UI config has no time filter schema
    #[error("a date range was set, but no time filter is configured")]
    MissingTimeConfig,

    /// The assembled operation could not be encoded as JSON
    #[error("could not encode the operation chain")]
    Serialization(#[from] serde_json::Error),
}

/// Problems loading the UI configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("header {name} is not valid")]
    InvalidHeader { name: String },

    #[error("could not build the HTTP client")]
    Client(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Top-level error returned by [`crate::SubmissionController::execute`]
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Build(#[from] BuildError),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
