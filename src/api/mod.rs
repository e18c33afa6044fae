mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::features::FeatureManager;
use crate::relation::RelationRegistry;

pub use middleware::SecurityConfig;

/// Shared state for the admin API.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub features: Arc<FeatureManager>,
    pub relations: Arc<RelationRegistry>,
    pub security: SecurityConfig,
}

impl AppState {
    pub fn new(db: Database, features: Arc<FeatureManager>, relations: Arc<RelationRegistry>) -> Self {
        Self {
            db,
            features,
            relations,
            security: SecurityConfig::disabled(),
        }
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Features
        .route("/features", get(handlers::list_features))
        .route("/features/tree", get(handlers::get_feature_tree))
        .route("/features/{key}", get(handlers::get_feature))
        .route("/features/{key}", put(handlers::set_feature))
        .route("/features/{key}/on", get(handlers::feature_on))
        .route("/features/{key}/history", get(handlers::get_feature_history))
        // Relations
        .route("/relations", get(handlers::list_relations))
        .route("/relations/{name}", get(handlers::get_relation))
        .route("/relations/{name}", put(handlers::replace_relation))
        .route("/relations/{name}", delete(handlers::clear_relation))
        .route("/relations/{name}/pairs", post(handlers::add_pair))
        .route("/relations/{name}/pairs/{left}/{right}", delete(handlers::remove_pair))
        .route("/relations/{name}/left/{id}", get(handlers::right_ids))
        .route("/relations/{name}/right/{id}", get(handlers::left_ids))
        // Set comparison
        .route("/compare", post(handlers::compare))
        // Only the routes above require credentials
        .route_layer(axum::middleware::from_fn_with_state(
            state.security.clone(),
            middleware::auth_middleware,
        ))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
