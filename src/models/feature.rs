use serde::{Deserialize, Serialize};

/// Point-in-time view of one feature flag.
///
/// `enabled` is the node's own flag. `effective` is what [`on`] answers: the
/// node and every ancestor up to its root must be enabled.
///
/// [`on`]: crate::features::FeatureManager::on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub key: String,
    pub description: String,
    pub enabled: bool,
    pub effective: bool,
    /// Key of the parent node. `None` for roots.
    pub parent: Option<String>,
}

/// A feature with its nested children, used for tree responses.
///
/// The status fields are flattened into the JSON response, with an additional
/// `children` array containing nested `FeatureTreeNode` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTreeNode {
    #[serde(flatten)]
    pub status: FeatureStatus,
    pub children: Vec<FeatureTreeNode>,
}

/// Input for flipping a feature's own flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFeatureInput {
    pub enabled: bool,
    /// Who made the change. Defaults to `api`.
    #[serde(default)]
    pub source: Option<String>,
}
