use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::VehicleListResponse;
use crate::server::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::vehicles::get_user_vehicles,
        handlers::vehicles::get_all_vehicles
    ),
    components(schemas(VehicleListResponse))
)]
struct ApiDoc;

/// Create the main API router with state
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .nest("/api/v1", api_v1_router())
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/vehicles/all",
            get(handlers::vehicles::get_all_vehicles),
        )
        .route(
            "/users/{id}/vehicles",
            get(handlers::vehicles::get_user_vehicles),
        )
}

/// Reports readiness. The service is not healthy while the response
/// dispatcher holds no subscription: no outstanding or future request
/// could ever settle in that state.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.dispatcher.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting", "detail": "response dispatcher not subscribed" })),
        )
    }
}

/// Bridge counters plus the current in-flight request count.
async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "bridge": state.metrics.snapshot(),
        "inFlight": state.requester.in_flight(),
    }))
}
