//! Hierarchical feature flags.
//!
//! Features form a tree. Each node carries its own `enabled` flag, and a
//! node is *effectively* on only when it and every ancestor up to its root
//! are enabled. [`FeatureManager::on`] answers from a flattened
//! `key -> effective` map that is rebuilt from scratch after every change
//! and published by swapping a single [`Arc`], so readers see either the
//! old map or the new one.
//!
//! ```
//! use gemini::features::FeatureManager;
//!
//! let features = FeatureManager::new();
//! features
//!     .add("monitor", "Health monitoring")?
//!     .add("cpu", "CPU sampling")?
//!     .add("disk", "Disk sampling")?;
//!
//! assert!(features.on("cpu"));
//! features.set("monitor", false);
//! assert!(!features.on("cpu"));
//! assert_eq!(features.is_enabled("cpu"), Some(true));
//! # Ok::<(), gemini::Error>(())
//! ```

mod definition;
mod render;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{parse_bool, Properties, FEATURE_PREFIX};
use crate::error::{Error, Result};
use crate::models::{FeatureStatus, FeatureTreeNode};

pub use definition::FeatureDefinition;
pub use render::render_tree;

/// Index of a node in the manager's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One flag in the tree. Nodes are owned by the manager; `parent` is a
/// back-reference used only to walk up the ancestor chain.
#[derive(Debug, Clone)]
struct FeatureNode {
    key: String,
    description: String,
    enabled: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct FeatureTree {
    nodes: Vec<FeatureNode>,
    roots: Vec<NodeId>,
    by_key: HashMap<String, NodeId>,
}

impl FeatureTree {
    fn node(&self, id: NodeId) -> &FeatureNode {
        &self.nodes[id.0]
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        key: &str,
        description: &str,
        enabled: bool,
    ) -> Result<NodeId> {
        if self.by_key.contains_key(key) {
            return Err(Error::DuplicateFeatureKey(key.to_string()));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(FeatureNode {
            key: key.to_string(),
            description: description.to_string(),
            enabled,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    fn is_fully_enabled(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if !node.enabled {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Pre-order walk carrying whether every ancestor is enabled.
    fn flatten(&self) -> HashMap<String, bool> {
        fn visit(tree: &FeatureTree, id: NodeId, ancestors: bool, out: &mut HashMap<String, bool>) {
            let node = tree.node(id);
            let effective = ancestors && node.enabled;
            out.insert(node.key.clone(), effective);
            for &child in &node.children {
                visit(tree, child, effective, out);
            }
        }

        let mut out = HashMap::with_capacity(self.nodes.len());
        for &root in &self.roots {
            visit(self, root, true, &mut out);
        }
        out
    }

    fn status(&self, id: NodeId, effective: bool) -> FeatureStatus {
        let node = self.node(id);
        FeatureStatus {
            key: node.key.clone(),
            description: node.description.clone(),
            enabled: node.enabled,
            effective,
            parent: node.parent.map(|p| self.node(p).key.clone()),
        }
    }
}

/// Registry and evaluator for the feature tree.
#[derive(Debug, Default)]
pub struct FeatureManager {
    tree: RwLock<FeatureTree>,
    status: RwLock<Arc<HashMap<String, bool>>>,
}

impl FeatureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager from declared definitions.
    pub fn from_definitions(definitions: &[FeatureDefinition]) -> Result<Self> {
        let manager = Self::new();
        for definition in definitions {
            definition.register(&manager, None)?;
        }
        Ok(manager)
    }

    // ============================================================
    // Registration
    // ============================================================

    /// Add an enabled root feature.
    pub fn add(&self, key: &str, description: &str) -> Result<FeatureNodeRef<'_>> {
        self.add_with_default(key, description, true)
    }

    /// Add a root feature with an explicit initial state.
    pub fn add_with_default(
        &self,
        key: &str,
        description: &str,
        enabled: bool,
    ) -> Result<FeatureNodeRef<'_>> {
        let id = self.insert(None, key, description, enabled)?;
        Ok(FeatureNodeRef { manager: self, id })
    }

    fn insert(
        &self,
        parent: Option<NodeId>,
        key: &str,
        description: &str,
        enabled: bool,
    ) -> Result<NodeId> {
        let mut tree = self.tree.write();
        let id = tree.insert(parent, key, description, enabled)?;
        self.publish(&tree);
        Ok(id)
    }

    /// Handle to any node, for adding nested children or inspecting it.
    pub fn node(&self, key: &str) -> Option<FeatureNodeRef<'_>> {
        let id = *self.tree.read().by_key.get(key)?;
        Some(FeatureNodeRef { manager: self, id })
    }

    // ============================================================
    // Evaluation
    // ============================================================

    /// Whether `key` and all of its ancestors are enabled. Unknown keys are
    /// off.
    pub fn on(&self, key: &str) -> bool {
        self.status.read().get(key).copied().unwrap_or(false)
    }

    /// The node's own flag, ignoring ancestors. `None` for unknown keys.
    pub fn is_enabled(&self, key: &str) -> Option<bool> {
        let tree = self.tree.read();
        tree.by_key.get(key).map(|&id| tree.node(id).enabled)
    }

    /// The current flattened map. It is never mutated after publication.
    pub fn status_map(&self) -> Arc<HashMap<String, bool>> {
        Arc::clone(&self.status.read())
    }

    // ============================================================
    // Mutation
    // ============================================================

    /// Set a node's own flag and republish the flattened map. Returns false
    /// if the key is unknown.
    pub fn set(&self, key: &str, enabled: bool) -> bool {
        let mut tree = self.tree.write();
        let Some(&id) = tree.by_key.get(key) else {
            tracing::warn!("Ignoring change to unknown feature: {}", key);
            return false;
        };
        tree.nodes[id.0].enabled = enabled;
        self.publish(&tree);

        tracing::info!("Feature {} set to {}", key, enabled);
        true
    }

    /// Flip a node's own flag, returning the new value.
    pub fn toggle(&self, key: &str) -> Option<bool> {
        let mut tree = self.tree.write();
        let id = *tree.by_key.get(key)?;
        let node = &mut tree.nodes[id.0];
        node.enabled = !node.enabled;
        let enabled = node.enabled;
        self.publish(&tree);

        tracing::info!("Feature {} toggled to {}", key, enabled);
        Some(enabled)
    }

    /// Apply every `Feature.*` property. Only the last dotted segment names
    /// the feature; the segments before it are not checked against the
    /// tree. Returns the number of flags applied.
    pub fn configure(&self, props: &Properties) -> usize {
        let mut tree = self.tree.write();
        let mut applied = 0;

        for (path, value) in props.with_prefix(FEATURE_PREFIX) {
            let key = leaf_key(path);
            let Some(&id) = tree.by_key.get(key) else {
                tracing::warn!("Configuration names unknown feature: {}{}", FEATURE_PREFIX, path);
                continue;
            };
            let Some(enabled) = parse_bool(value) else {
                tracing::warn!(
                    "Configuration value for {}{} is not a boolean: {}",
                    FEATURE_PREFIX,
                    path,
                    value
                );
                continue;
            };
            tree.nodes[id.0].enabled = enabled;
            applied += 1;
        }

        self.publish(&tree);
        tracing::debug!("Applied {} feature settings from configuration", applied);
        applied
    }

    /// Rebuild the flattened map from `tree` and swap it in. Callers hold the
    /// tree write lock, so publications happen in mutation order.
    fn publish(&self, tree: &FeatureTree) {
        let flattened = Arc::new(tree.flatten());
        *self.status.write() = flattened;
    }

    // ============================================================
    // Inspection
    // ============================================================

    pub fn len(&self) -> usize {
        self.tree.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.tree.read().nodes.iter().map(|n| n.key.clone()).collect()
    }

    pub fn status(&self, key: &str) -> Option<FeatureStatus> {
        let tree = self.tree.read();
        let id = *tree.by_key.get(key)?;
        Some(tree.status(id, tree.is_fully_enabled(id)))
    }

    /// Every node in depth-first pre-order.
    pub fn statuses(&self) -> Vec<FeatureStatus> {
        fn visit(tree: &FeatureTree, id: NodeId, ancestors: bool, out: &mut Vec<FeatureStatus>) {
            let effective = ancestors && tree.node(id).enabled;
            out.push(tree.status(id, effective));
            for &child in &tree.node(id).children {
                visit(tree, child, effective, out);
            }
        }

        let tree = self.tree.read();
        let mut out = Vec::with_capacity(tree.nodes.len());
        for &root in &tree.roots {
            visit(&tree, root, true, &mut out);
        }
        out
    }

    /// The whole hierarchy as nested nodes.
    pub fn tree(&self) -> Vec<FeatureTreeNode> {
        fn build(tree: &FeatureTree, id: NodeId, ancestors: bool) -> FeatureTreeNode {
            let effective = ancestors && tree.node(id).enabled;
            FeatureTreeNode {
                status: tree.status(id, effective),
                children: tree
                    .node(id)
                    .children
                    .iter()
                    .map(|&child| build(tree, child, effective))
                    .collect(),
            }
        }

        let tree = self.tree.read();
        tree.roots.iter().map(|&root| build(&tree, root, true)).collect()
    }
}

/// Last segment of a dotted feature path.
fn leaf_key(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Handle to a node inside a [`FeatureManager`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureNodeRef<'a> {
    manager: &'a FeatureManager,
    id: NodeId,
}

impl<'a> FeatureNodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> String {
        self.manager.tree.read().node(self.id).key.clone()
    }

    pub fn description(&self) -> String {
        self.manager.tree.read().node(self.id).description.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.manager.tree.read().node(self.id).enabled
    }

    /// Walks the ancestor chain rather than reading the flattened map.
    pub fn is_fully_enabled(&self) -> bool {
        self.manager.tree.read().is_fully_enabled(self.id)
    }

    pub fn parent(&self) -> Option<FeatureNodeRef<'a>> {
        let parent = self.manager.tree.read().node(self.id).parent?;
        Some(FeatureNodeRef {
            manager: self.manager,
            id: parent,
        })
    }

    pub fn children(&self) -> Vec<FeatureNodeRef<'a>> {
        self.manager
            .tree
            .read()
            .node(self.id)
            .children
            .iter()
            .map(|&id| FeatureNodeRef {
                manager: self.manager,
                id,
            })
            .collect()
    }

    /// Add an enabled child and return this (parent) node for chaining.
    pub fn add(self, key: &str, description: &str) -> Result<Self> {
        self.add_with_default(key, description, true)
    }

    /// Add a child with an explicit initial state and return this (parent)
    /// node for chaining.
    pub fn add_with_default(self, key: &str, description: &str, enabled: bool) -> Result<Self> {
        self.manager.insert(Some(self.id), key, description, enabled)?;
        Ok(self)
    }

    /// Set this node's own flag. Returns the result of [`FeatureManager::set`].
    pub fn set(&self, enabled: bool) -> bool {
        let key = self.key();
        self.manager.set(&key, enabled)
    }
}
