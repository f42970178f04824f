use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use fleetlink_core::model::VehicleFilter;

use crate::error::AppError;
use crate::models::VehicleListResponse;
use crate::server::AppState;

/// Get the vehicles owned by one user
///
/// Issues a BY_OWNER query to the vehicle service over the bus and awaits
/// the bridged response.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/vehicles",
    params(("id" = String, Path, description = "Owner user id")),
    responses(
        (status = 200, description = "Vehicles owned by the user", body = VehicleListResponse),
        (status = 502, description = "Vehicle service reported an error"),
        (status = 504, description = "Vehicle service did not answer in time")
    )
)]
#[axum::debug_handler]
pub async fn get_user_vehicles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VehicleListResponse>, AppError> {
    let vehicles = state.requester.fetch_by_owner(&user_id).await?;
    Ok(Json(vehicles.into()))
}

/// Get all vehicles
///
/// Issues an ALL query with the caller's filter to the vehicle service.
#[utoipa::path(
    get,
    path = "/api/v1/users/vehicles/all",
    params(
        ("status" = Option<String>, Query, description = "Filter by vehicle status"),
        ("make" = Option<String>, Query, description = "Filter by make"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("year" = Option<i32>, Query, description = "Filter by model year")
    ),
    responses(
        (status = 200, description = "All vehicles matching the filter", body = VehicleListResponse),
        (status = 502, description = "Vehicle service reported an error"),
        (status = 504, description = "Vehicle service did not answer in time")
    )
)]
#[axum::debug_handler]
pub async fn get_all_vehicles(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> Result<Json<VehicleListResponse>, AppError> {
    let vehicles = state.requester.fetch_all(filter).await?;
    Ok(Json(vehicles.into()))
}
