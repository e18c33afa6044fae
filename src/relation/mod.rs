//! Many-to-many relations between two identifier domains.
//!
//! # Core Concepts
//!
//! - [`IdRelation`]: a named set of `(left, right)` id pairs with a lookup
//!   view per side, written through to a [`RelationStore`].
//! - [`EntityRelation`]: typed wrapper that knows which entity type lives on
//!   each side, for cascading deletes and materializing values.
//! - [`RelationRegistry`]: the named relations an application serves.
//!
//! # Consistency
//!
//! Readers always see a complete [`RelationIndex`]. Single-pair mutations
//! happen under the index write lock; [`IdRelation::replace_all`] builds the
//! new index off-lock and swaps it in with one assignment, so there is never
//! an empty window between the old and the new contents.

mod entity;
mod index;
mod store;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::compare::SetComparison;
use crate::error::{Error, Result};

pub use entity::*;
pub use index::RelationIndex;
pub use store::{MemoryStore, RelationStore};

/// One row of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub left: i64,
    pub right: i64,
}

impl Pair {
    pub fn new(left: i64, right: i64) -> Self {
        Self { left, right }
    }
}

impl From<(i64, i64)> for Pair {
    fn from((left, right): (i64, i64)) -> Self {
        Self::new(left, right)
    }
}

/// Identifier-only relation.
pub struct IdRelation {
    name: String,
    store: Arc<dyn RelationStore>,
    index: RwLock<Arc<RelationIndex>>,
    /// Serializes writers across "persist, then apply".
    writer: Mutex<()>,
}

impl fmt::Debug for IdRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdRelation")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

impl IdRelation {
    /// Create an empty relation without reading the store.
    pub fn new(name: impl Into<String>, store: Arc<dyn RelationStore>) -> Self {
        Self {
            name: name.into(),
            store,
            index: RwLock::new(Arc::new(RelationIndex::new())),
            writer: Mutex::new(()),
        }
    }

    /// Relation that is never persisted.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(MemoryStore))
    }

    /// Create a relation and populate it from the store.
    pub fn open(name: impl Into<String>, store: Arc<dyn RelationStore>) -> Result<Self> {
        let relation = Self::new(name, store);
        relation.reload()?;
        Ok(relation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current version of the index. Later mutations do not affect the
    /// returned value.
    pub fn snapshot(&self) -> Arc<RelationIndex> {
        Arc::clone(&self.index.read())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn contains(&self, left: i64, right: i64) -> bool {
        self.index.read().contains(Pair::new(left, right))
    }

    pub fn contains_left_value(&self, left: i64) -> bool {
        self.index.read().contains_left(left)
    }

    pub fn contains_right_value(&self, right: i64) -> bool {
        self.index.read().contains_right(right)
    }

    /// Left ids related to `right`. Empty when there are none.
    pub fn left_ids(&self, right: i64) -> BTreeSet<i64> {
        self.index.read().lefts_of(right)
    }

    /// Right ids related to `left`. Empty when there are none.
    pub fn right_ids(&self, left: i64) -> BTreeSet<i64> {
        self.index.read().rights_of(left)
    }

    pub fn left_count(&self, right: i64) -> usize {
        self.index.read().left_count(right)
    }

    pub fn right_count(&self, left: i64) -> usize {
        self.index.read().right_count(left)
    }

    pub fn size(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    pub fn pairs(&self) -> Vec<Pair> {
        self.index.read().pairs()
    }

    // ============================================================
    // Mutations
    // ============================================================

    /// Add a pair. Returns false, without touching the store, if it is
    /// already present.
    pub fn add(&self, left: i64, right: i64) -> Result<bool> {
        let pair = self.validate(Pair::new(left, right))?;
        let _writer = self.writer.lock();

        if self.index.read().contains(pair) {
            return Ok(false);
        }
        self.store.insert(&self.name, &[pair])?;
        Arc::make_mut(&mut self.index.write()).insert(pair);

        tracing::debug!(relation = %self.name, left, right, "Added pair");
        Ok(true)
    }

    /// Add many pairs, returning how many were new.
    pub fn add_all<I, P>(&self, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<Pair>,
    {
        let pairs = pairs
            .into_iter()
            .map(|p| self.validate(p.into()))
            .collect::<Result<BTreeSet<_>>>()?;
        let _writer = self.writer.lock();

        let fresh: Vec<Pair> = {
            let index = self.index.read();
            pairs.into_iter().filter(|p| !index.contains(*p)).collect()
        };
        if fresh.is_empty() {
            return Ok(0);
        }

        self.store.insert(&self.name, &fresh)?;
        let mut guard = self.index.write();
        let index = Arc::make_mut(&mut guard);
        for pair in &fresh {
            index.insert(*pair);
        }

        tracing::debug!(relation = %self.name, count = fresh.len(), "Added pairs");
        Ok(fresh.len())
    }

    /// Remove a pair. Returns false if it was not present.
    pub fn remove(&self, left: i64, right: i64) -> Result<bool> {
        let pair = Pair::new(left, right);
        let _writer = self.writer.lock();

        if !self.index.read().contains(pair) {
            return Ok(false);
        }
        self.store.delete(&self.name, &[pair])?;
        Arc::make_mut(&mut self.index.write()).remove(pair);

        tracing::debug!(relation = %self.name, left, right, "Removed pair");
        Ok(true)
    }

    /// Remove every pair with `left` on the left side.
    pub fn remove_left_value(&self, left: i64) -> Result<usize> {
        let _writer = self.writer.lock();
        let doomed = self.index.read().pairs_with_left(left);
        self.remove_locked(&doomed)
    }

    /// Remove every pair with `right` on the right side.
    pub fn remove_right_value(&self, right: i64) -> Result<usize> {
        let _writer = self.writer.lock();
        let doomed = self.index.read().pairs_with_right(right);
        self.remove_locked(&doomed)
    }

    fn remove_locked(&self, doomed: &[Pair]) -> Result<usize> {
        if doomed.is_empty() {
            return Ok(0);
        }
        self.store.delete(&self.name, doomed)?;
        let mut guard = self.index.write();
        let index = Arc::make_mut(&mut guard);
        for pair in doomed {
            index.remove(*pair);
        }

        tracing::debug!(relation = %self.name, count = doomed.len(), "Removed pairs");
        Ok(doomed.len())
    }

    /// Remove everything. Readers may observe the empty relation afterwards;
    /// use [`IdRelation::replace_all`] to swap contents without that window.
    pub fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock();
        self.store.clear(&self.name)?;
        *self.index.write() = Arc::new(RelationIndex::new());

        tracing::debug!(relation = %self.name, "Cleared relation");
        Ok(())
    }

    /// Replace the whole contents with `pairs`.
    ///
    /// Only the difference between the old and new contents is sent to the
    /// store. Concurrent readers see either the old or the new relation.
    pub fn replace_all<I, P>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<Pair>,
    {
        let replacement = RelationIndex::from_pairs(
            pairs
                .into_iter()
                .map(|p| self.validate(p.into()))
                .collect::<Result<Vec<_>>>()?,
        );
        let _writer = self.writer.lock();

        let current = self.snapshot();
        let diff = SetComparison::new(current.pairs(), replacement.pairs());
        if !diff.is_identical() {
            self.store
                .replace(&self.name, diff.b_minus_a(), diff.a_minus_b())?;
        }

        let size = replacement.len();
        *self.index.write() = Arc::new(replacement);

        tracing::debug!(
            relation = %self.name,
            added = diff.b_minus_a().len(),
            removed = diff.a_minus_b().len(),
            size,
            "Replaced relation"
        );
        Ok(())
    }

    /// Re-read the relation from its store and swap it in.
    pub fn reload(&self) -> Result<()> {
        let _writer = self.writer.lock();
        let index = RelationIndex::from_pairs(self.store.load(&self.name)?);
        let size = index.len();
        *self.index.write() = Arc::new(index);

        tracing::debug!(relation = %self.name, size, "Loaded relation");
        Ok(())
    }

    fn validate(&self, pair: Pair) -> Result<Pair> {
        let bad = |side, id| Error::InvalidId {
            relation: self.name.clone(),
            side,
            id,
        };
        if pair.left < 0 {
            return Err(bad("left", pair.left));
        }
        if pair.right < 0 {
            return Err(bad("right", pair.right));
        }
        Ok(pair)
    }
}

// ============================================================
// Registry
// ============================================================

/// Named relations served by an application.
#[derive(Debug, Default)]
pub struct RelationRegistry {
    relations: RwLock<BTreeMap<String, Arc<IdRelation>>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every named relation from `store`.
    pub fn open_all<S: AsRef<str>>(
        names: &[S],
        store: Arc<dyn RelationStore>,
    ) -> Result<Self> {
        let registry = Self::new();
        for name in names {
            let relation = IdRelation::open(name.as_ref(), Arc::clone(&store))?;
            tracing::info!(
                relation = relation.name(),
                size = relation.size(),
                "Opened relation"
            );
            registry.register(Arc::new(relation))?;
        }
        Ok(registry)
    }

    pub fn register(&self, relation: Arc<IdRelation>) -> Result<()> {
        let mut relations = self.relations.write();
        if relations.contains_key(relation.name()) {
            return Err(Error::Config(format!(
                "Relation registered twice: {}",
                relation.name()
            )));
        }
        relations.insert(relation.name().to_string(), relation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<IdRelation>> {
        self.relations.read().get(name).cloned()
    }

    /// Like [`RelationRegistry::get`], but unknown names are an error.
    pub fn require(&self, name: &str) -> Result<Arc<IdRelation>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownRelation(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.relations.read().keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Arc<IdRelation>> {
        self.relations.read().values().cloned().collect()
    }
}
