use thiserror::Error;

/// Errors raised by the Gemini core.
#[derive(Error, Debug)]
pub enum Error {
    /// A feature key was registered twice. This is a configuration defect and
    /// is meant to abort startup.
    #[error("Duplicate feature key: {0}")]
    DuplicateFeatureKey(String),
    #[error("Feature not found: {0}")]
    UnknownFeature(String),
    #[error("Relation not found: {0}")]
    UnknownRelation(String),
    /// Relation identifiers must be non-negative.
    #[error("Invalid identifier {id} on {side} side of relation {relation}")]
    InvalidId {
        relation: String,
        side: &'static str,
        id: i64,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Failed to apply migration {version}: {source}")]
    Migration {
        version: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is caused by the caller's input rather than by the
    /// service itself.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateFeatureKey(_) | Self::InvalidId { .. } | Self::Config(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownFeature(_) | Self::UnknownRelation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
