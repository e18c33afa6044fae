use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only log entry recording a runtime change to a feature flag.
///
/// Only the node's own flag is recorded. Effective status is derived from
/// the tree and is not part of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureHistory {
    pub id: Uuid,
    pub key: String,
    pub enabled: bool,
    /// Who made the change (`api`, `config`, an operator name).
    pub source: String,
    pub created_at: DateTime<Utc>,
}
