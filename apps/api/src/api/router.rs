use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{epochs, health, studies, timeline, visits};
use super::state::AppState;

/// Builds the application router
///
/// Middleware (tracing, CORS) is layered on by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Study routes
        .route(
            "/api/studies",
            post(studies::create_study).get(studies::list_studies),
        )
        .route(
            "/api/studies/:study_uid",
            get(studies::get_study).delete(studies::delete_study),
        )
        // Epoch routes
        .route(
            "/api/studies/:study_uid/study-epochs",
            post(epochs::add_epoch).get(epochs::list_epochs),
        )
        .route(
            "/api/studies/:study_uid/study-epochs/:uid",
            patch(epochs::edit_epoch).delete(epochs::delete_epoch),
        )
        .route(
            "/api/studies/:study_uid/study-epochs/:uid/order/:new_order",
            patch(epochs::reorder_epoch),
        )
        // Visit routes
        .route(
            "/api/studies/:study_uid/study-visits",
            post(visits::add_visit).get(visits::list_visits),
        )
        .route(
            "/api/studies/:study_uid/study-visits/:uid",
            get(visits::get_visit)
                .put(visits::edit_visit)
                .delete(visits::delete_visit),
        )
        // Timeline routes
        .route(
            "/api/studies/:study_uid/timeline",
            get(timeline::get_timeline),
        )
        .route("/api/timeline/preview", post(timeline::preview_timeline))
        .with_state(state)
}
