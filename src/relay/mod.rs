use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::upstream::{UpstreamClient, ANALYZE_PATH, COSINE_SIM_PATH, EMBED_PATH, HEALTH_PATH};

pub(crate) mod handlers;
pub(crate) mod models;
pub(crate) mod upload;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    pub(crate) upstream: UpstreamClient,
}

pub(crate) fn router(state: AppState) -> Router {
    let image_router = Router::new()
        .route(ANALYZE_PATH, post(handlers::handle_analyze_request))
        .route(EMBED_PATH, post(handlers::handle_embed_request))
        .route(COSINE_SIM_PATH, post(handlers::handle_cosine_sim_request))
        // Images are buffered whole; only memory and the forward timeout bound their size
        .layer(DefaultBodyLimit::disable());

    Router::new()
        .route("/", get(handlers::handle_info_request))
        .route(HEALTH_PATH, get(handlers::handle_health_request))
        .merge(image_router)
        .with_state(state)
}
