use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{FeatureManager, NodeId};
use crate::error::Result;

/// Declarative form of a feature subtree, as stored in a features file.
///
/// ```json
/// [
///   { "key": "monitor", "description": "Monitoring", "children": [
///       { "key": "cpu", "enabled": false }
///   ]}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub key: String,
    #[serde(default)]
    pub description: String,
    /// Initial state. Defaults to enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub children: Vec<FeatureDefinition>,
}

fn default_enabled() -> bool {
    true
}

impl FeatureDefinition {
    pub fn parse(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub(super) fn register(&self, manager: &FeatureManager, parent: Option<NodeId>) -> Result<()> {
        let id = manager.insert(parent, &self.key, &self.description, self.enabled)?;
        for child in &self.children {
            child.register(manager, Some(id))?;
        }
        Ok(())
    }
}

impl FeatureManager {
    /// Build a manager from a JSON features file.
    pub fn load_definitions(path: &Path) -> Result<Self> {
        let definitions = FeatureDefinition::load(path)?;
        let manager = Self::from_definitions(&definitions)?;
        tracing::info!(
            "Loaded {} features from {}",
            manager.len(),
            path.display()
        );
        Ok(manager)
    }
}
