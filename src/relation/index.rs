use std::collections::{BTreeMap, BTreeSet};

use super::Pair;

/// Two-sided lookup structure for one version of a relation.
///
/// Both views are kept in step: every pair appears exactly once under its
/// left id and once under its right id. Empty id sets are pruned so that
/// `contains_left_value`/`contains_right_value` stay exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationIndex {
    by_left: BTreeMap<i64, BTreeSet<i64>>,
    by_right: BTreeMap<i64, BTreeSet<i64>>,
    len: usize,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = Pair>) -> Self {
        let mut index = Self::new();
        for pair in pairs {
            index.insert(pair);
        }
        index
    }

    /// Returns false if the pair was already present.
    pub fn insert(&mut self, pair: Pair) -> bool {
        let added = self.by_left.entry(pair.left).or_default().insert(pair.right);
        if added {
            self.by_right.entry(pair.right).or_default().insert(pair.left);
            self.len += 1;
        }
        added
    }

    pub fn remove(&mut self, pair: Pair) -> bool {
        let removed = remove_from(&mut self.by_left, pair.left, pair.right);
        if removed {
            remove_from(&mut self.by_right, pair.right, pair.left);
            self.len -= 1;
        }
        removed
    }

    pub fn contains(&self, pair: Pair) -> bool {
        self.by_left
            .get(&pair.left)
            .is_some_and(|rights| rights.contains(&pair.right))
    }

    pub fn contains_left(&self, left: i64) -> bool {
        self.by_left.contains_key(&left)
    }

    pub fn contains_right(&self, right: i64) -> bool {
        self.by_right.contains_key(&right)
    }

    pub fn rights_of(&self, left: i64) -> BTreeSet<i64> {
        self.by_left.get(&left).cloned().unwrap_or_default()
    }

    pub fn lefts_of(&self, right: i64) -> BTreeSet<i64> {
        self.by_right.get(&right).cloned().unwrap_or_default()
    }

    pub fn right_count(&self, left: i64) -> usize {
        self.by_left.get(&left).map_or(0, BTreeSet::len)
    }

    pub fn left_count(&self, right: i64) -> usize {
        self.by_right.get(&right).map_or(0, BTreeSet::len)
    }

    /// Every pair that has `left` on its left side.
    pub fn pairs_with_left(&self, left: i64) -> Vec<Pair> {
        self.by_left
            .get(&left)
            .map(|rights| rights.iter().map(|&right| Pair::new(left, right)).collect())
            .unwrap_or_default()
    }

    pub fn pairs_with_right(&self, right: i64) -> Vec<Pair> {
        self.by_right
            .get(&right)
            .map(|lefts| lefts.iter().map(|&left| Pair::new(left, right)).collect())
            .unwrap_or_default()
    }

    /// All pairs ordered by left id, then right id.
    pub fn pairs(&self) -> Vec<Pair> {
        self.by_left
            .iter()
            .flat_map(|(&left, rights)| rights.iter().map(move |&right| Pair::new(left, right)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn remove_from(map: &mut BTreeMap<i64, BTreeSet<i64>>, key: i64, value: i64) -> bool {
    let Some(values) = map.get_mut(&key) else {
        return false;
    };
    let removed = values.remove(&value);
    if values.is_empty() {
        map.remove(&key);
    }
    removed
}
