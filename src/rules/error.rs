use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The rule source could not be turned into a usable [`RuleModel`](super::RuleModel).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rule source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed YAML rule source: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed JSON rule source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid rule source: {0}")]
    Invalid(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// An intent pattern that failed to compile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("intent '{intent}': pattern '{pattern}' does not compile: {message}")]
pub struct PatternError {
    pub intent: String,
    pub pattern: String,
    pub message: String,
}
