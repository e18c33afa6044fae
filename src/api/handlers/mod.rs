use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::AppState;
use crate::compare::{ComparisonResult, IntSetComparison};
use crate::error::Error;
use crate::models::*;
use crate::relation::Pair;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map an error to a response. Validation and lookup failures are returned
/// to the client as-is; anything else is logged and replaced with a generic
/// message to avoid leaking internal details.
fn api_error(e: Error) -> (StatusCode, String) {
    if e.is_not_found() {
        return (StatusCode::NOT_FOUND, e.to_string());
    }
    if e.is_validation() {
        tracing::warn!("Validation error: {}", e);
        return (StatusCode::BAD_REQUEST, e.to_string());
    }

    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn feature_not_found(key: &str) -> (StatusCode, String) {
    api_error(Error::UnknownFeature(key.to_string()))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Features
// ============================================================

pub async fn list_features(State(state): State<AppState>) -> Json<Vec<FeatureStatus>> {
    Json(state.features.statuses())
}

pub async fn get_feature_tree(State(state): State<AppState>) -> Json<Vec<FeatureTreeNode>> {
    Json(state.features.tree())
}

pub async fn get_feature(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<FeatureStatus>> {
    state
        .features
        .status(&key)
        .map(Json)
        .ok_or_else(|| feature_not_found(&key))
}

/// Effective status only. Unknown keys answer `false` like [`on`].
///
/// [`on`]: crate::features::FeatureManager::on
pub async fn feature_on(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    Json(serde_json::json!({ "key": key, "on": state.features.on(&key) }))
}

/// Persist the new flag, then apply it to the live tree.
pub async fn set_feature(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(input): Json<SetFeatureInput>,
) -> ApiResult<Json<FeatureStatus>> {
    if state.features.is_enabled(&key).is_none() {
        return Err(feature_not_found(&key));
    }

    let source = input.source.as_deref().unwrap_or("api");
    state
        .db
        .save_feature_state(&key, input.enabled, source)
        .map_err(api_error)?;
    state.features.set(&key, input.enabled);

    state
        .features
        .status(&key)
        .map(Json)
        .ok_or_else(|| feature_not_found(&key))
}

pub async fn get_feature_history(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<FeatureHistory>>> {
    if state.features.is_enabled(&key).is_none() {
        return Err(feature_not_found(&key));
    }
    state.db.get_feature_history(&key).map(Json).map_err(api_error)
}

// ============================================================
// Relations
// ============================================================

pub async fn list_relations(State(state): State<AppState>) -> Json<Vec<RelationSummary>> {
    Json(
        state
            .relations
            .all()
            .iter()
            .map(|r| RelationSummary {
                name: r.name().to_string(),
                size: r.size(),
            })
            .collect(),
    )
}

pub async fn get_relation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Pair>>> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    Ok(Json(relation.pairs()))
}

pub async fn replace_relation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<ReplaceRelationInput>,
) -> ApiResult<Json<RelationSummary>> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    relation.replace_all(input.pairs).map_err(api_error)?;
    Ok(Json(RelationSummary {
        name,
        size: relation.size(),
    }))
}

pub async fn clear_relation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    relation.clear().map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_pair(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(pair): Json<Pair>,
) -> ApiResult<(StatusCode, Json<PairChange>)> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    let changed = relation.add(pair.left, pair.right).map_err(api_error)?;
    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(PairChange { pair, changed })))
}

pub async fn remove_pair(
    State(state): State<AppState>,
    Path((name, left, right)): Path<(String, i64, i64)>,
) -> ApiResult<Json<PairChange>> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    let changed = relation.remove(left, right).map_err(api_error)?;
    Ok(Json(PairChange {
        pair: Pair::new(left, right),
        changed,
    }))
}

/// Right ids related to a left id.
pub async fn right_ids(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, i64)>,
) -> ApiResult<Json<RelatedIds>> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    Ok(Json(RelatedIds {
        id,
        related: relation.right_ids(id).into_iter().collect(),
    }))
}

/// Left ids related to a right id.
pub async fn left_ids(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, i64)>,
) -> ApiResult<Json<RelatedIds>> {
    let relation = state.relations.require(&name).map_err(api_error)?;
    Ok(Json(RelatedIds {
        id,
        related: relation.left_ids(id).into_iter().collect(),
    }))
}

// ============================================================
// Set comparison
// ============================================================

pub async fn compare(Json(input): Json<CompareInput>) -> Json<ComparisonResult<i64>> {
    Json(IntSetComparison::new(input.a, input.b).into_result())
}
