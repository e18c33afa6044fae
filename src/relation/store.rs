use super::Pair;
use crate::error::Result;

/// Persistence behind a relation.
///
/// Every mutating call on a relation writes through to its store and blocks
/// until the store returns. A failed call leaves the in-memory relation
/// unchanged.
pub trait RelationStore: Send + Sync {
    /// Load every pair persisted for `relation`.
    fn load(&self, relation: &str) -> Result<Vec<Pair>>;

    fn insert(&self, relation: &str, pairs: &[Pair]) -> Result<()>;

    fn delete(&self, relation: &str, pairs: &[Pair]) -> Result<()>;

    /// Apply both sides of a bulk replacement as one unit.
    fn replace(&self, relation: &str, added: &[Pair], removed: &[Pair]) -> Result<()>;

    fn clear(&self, relation: &str) -> Result<()>;
}

/// Store that keeps nothing, for relations that live purely in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStore;

impl RelationStore for MemoryStore {
    fn load(&self, _relation: &str) -> Result<Vec<Pair>> {
        Ok(Vec::new())
    }

    fn insert(&self, _relation: &str, _pairs: &[Pair]) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _relation: &str, _pairs: &[Pair]) -> Result<()> {
        Ok(())
    }

    fn replace(&self, _relation: &str, _added: &[Pair], _removed: &[Pair]) -> Result<()> {
        Ok(())
    }

    fn clear(&self, _relation: &str) -> Result<()> {
        Ok(())
    }
}
