//! Serializable views shared by the HTTP API, the CLI and the database.
//!
//! - [`FeatureStatus`] / [`FeatureTreeNode`]: flat and nested views of the
//!   feature hierarchy.
//! - [`FeatureHistory`]: append-only log of runtime flag changes.
//! - [`RelationSummary`], [`RelatedIds`], [`PairChange`]: relation responses.

mod feature;
mod history;
mod relation;

pub use feature::*;
pub use history::*;
pub use relation::*;
