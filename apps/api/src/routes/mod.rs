pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::resumes::handlers::{handle_extract_resumes, MAX_UPLOAD_BYTES};
use crate::screening::handlers as screening;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening API
        .route("/api/v1/criteria", post(screening::handle_extract_criteria))
        .route("/api/v1/evaluations", post(screening::handle_evaluate))
        .route(
            "/api/v1/sessions/:id/results.csv",
            get(screening::handle_export_results),
        )
        .route(
            "/api/v1/sessions/:id/results_detailed.csv",
            get(screening::handle_export_detailed_results),
        )
        // Resume intake
        .route(
            "/api/v1/resumes/extract",
            post(handle_extract_resumes).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Session API
        .route(
            "/api/session",
            get(session::handle_get_session)
                .post(session::handle_update_session)
                .delete(session::handle_clear_session),
        )
        .with_state(state)
}
