use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use super::IdRelation;
use crate::error::Result;

/// An identifiable record that can take part in a relation.
pub trait Entity {
    /// Name of the entity type, used to route cascading deletes.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> i64;
}

/// Materializes entities from their ids. Relations only hold ids; callers
/// supply the repository that owns the records.
pub trait EntityLookup<T> {
    fn find(&self, id: i64) -> Option<T>;
}

impl<T: Clone> EntityLookup<T> for HashMap<i64, T> {
    fn find(&self, id: i64) -> Option<T> {
        self.get(&id).cloned()
    }
}

/// Relation between entities of type `L` and `R`.
///
/// Dereferences to the underlying [`IdRelation`] for id-level operations.
pub struct EntityRelation<L, R> {
    ids: Arc<IdRelation>,
    _types: PhantomData<fn() -> (L, R)>,
}

impl<L, R> Clone for EntityRelation<L, R> {
    fn clone(&self) -> Self {
        Self {
            ids: Arc::clone(&self.ids),
            _types: PhantomData,
        }
    }
}

impl<L, R> Deref for EntityRelation<L, R> {
    type Target = IdRelation;

    fn deref(&self) -> &IdRelation {
        &self.ids
    }
}

impl<L: Entity, R: Entity> EntityRelation<L, R> {
    pub fn new(ids: Arc<IdRelation>) -> Self {
        Self {
            ids,
            _types: PhantomData,
        }
    }

    pub fn add_entities(&self, left: &L, right: &R) -> Result<bool> {
        self.ids.add(left.id(), right.id())
    }

    pub fn remove_entities(&self, left: &L, right: &R) -> Result<bool> {
        self.ids.remove(left.id(), right.id())
    }

    pub fn contains_entities(&self, left: &L, right: &R) -> bool {
        self.ids.contains(left.id(), right.id())
    }

    /// Remove every pair that references `entity`, on whichever side its
    /// type is declared. Returns the number of pairs removed.
    pub fn remove_entity<E: Entity>(&self, entity: &E) -> Result<usize> {
        self.remove_entity_by_type(E::ENTITY_TYPE, entity.id())
    }

    /// Cascading delete by type name and id. When both sides share the
    /// type, both sides are cleaned; an unrelated type removes nothing.
    pub fn remove_entity_by_type(&self, entity_type: &str, id: i64) -> Result<usize> {
        let mut removed = 0;
        if entity_type == L::ENTITY_TYPE {
            removed += self.ids.remove_left_value(id)?;
        }
        if entity_type == R::ENTITY_TYPE {
            removed += self.ids.remove_right_value(id)?;
        }
        Ok(removed)
    }

    /// Left entities related to `right`, in id order. Ids the lookup cannot
    /// resolve are skipped.
    pub fn left_values(&self, right: i64, lookup: &impl EntityLookup<L>) -> Vec<L> {
        self.ids
            .left_ids(right)
            .into_iter()
            .filter_map(|id| lookup.find(id))
            .collect()
    }

    pub fn right_values(&self, left: i64, lookup: &impl EntityLookup<R>) -> Vec<R> {
        self.ids
            .right_ids(left)
            .into_iter()
            .filter_map(|id| lookup.find(id))
            .collect()
    }
}
