use thiserror::Error;

use crate::models::EntityGroup;

/// Failures raised by the CRM store collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0} store is unavailable")]
    Unavailable(String),

    #[error("{source_name} query timed out after {ms}ms")]
    Timeout { source_name: &'static str, ms: u64 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Extraction faults. Each is scoped to the group that raised it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{group} produced more than {limit} matches")]
    TooManyMatches { group: EntityGroup, limit: usize },

    #[error("input of {len} chars exceeds the {limit} char limit")]
    InputTooLarge { len: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown timezone: {0}")]
    Timezone(String),

    #[error("unknown locale: {0}")]
    Locale(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
