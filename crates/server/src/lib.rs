pub mod auth;
pub mod error;
pub mod routes;

use axum::Router;
use db::DBService;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utils::jwt::TokenKeys;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DBService,
    pub token_keys: TokenKeys,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::residents::router())
        .merge(routes::care_plan::router())
        .merge(routes::feed::router())
        .merge(routes::staff::router());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
