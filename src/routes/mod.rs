// Route modules
pub mod credits;
pub mod turmas;

use crate::{
    app_state::AppState,
    middleware::{logging_middleware, tenant_middleware},
    models::common::{HealthData, SuccessResponse},
};
use axum::{
    http::HeaderName,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(state.clone()))
        .layer(middleware::from_fn(logging_middleware))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Tenant-scoped API routes
fn api_routes(state: AppState) -> Router<AppState> {
    let credit_routes = Router::new()
        .route("/student/{student_id}", get(credits::get_student_credits))
        .route("/summary/{student_id}", get(credits::get_credits_summary))
        .route("/use", post(credits::use_credits))
        .route("/refund", post(credits::refund_credits))
        .route("/expiring-soon", get(credits::get_expiring_credits))
        .route("/renew-manual", post(credits::renew_credits_manual))
        .route(
            "/{credit_id}/cancel-renewal",
            patch(credits::cancel_auto_renewal),
        )
        .route(
            "/renewal-history/{student_id}",
            get(credits::get_renewal_history),
        );

    let turma_routes = Router::new()
        .route("/available-now", get(turmas::available_now))
        .route("/check-in", post(turmas::check_in));

    Router::new()
        .nest("/credits", credit_routes)
        .nest("/turmas", turma_routes)
        .layer(middleware::from_fn_with_state(state, tenant_middleware))
}

/// GET /health
async fn health() -> Json<SuccessResponse<HealthData>> {
    Json(SuccessResponse::new(HealthData { status: "ok" }))
}
