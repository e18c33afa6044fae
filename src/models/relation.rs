use serde::{Deserialize, Serialize};

use crate::relation::Pair;

/// Name and size of a served relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSummary {
    pub name: String,
    pub size: usize,
}

/// Ids related to one id on the opposite side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedIds {
    pub id: i64,
    pub related: Vec<i64>,
}

/// Outcome of a single-pair mutation. `changed` is false when the call was
/// a no-op (pair already present, or already absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairChange {
    pub pair: Pair,
    pub changed: bool,
}

/// Input for replacing the full contents of a relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceRelationInput {
    pub pairs: Vec<Pair>,
}

/// Input for comparing two id lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInput {
    pub a: Vec<i64>,
    pub b: Vec<i64>,
}
