use fleetlink_core::model::Vehicle;
use serde::Serialize;
use utoipa::ToSchema;

/// Vehicle list response model
#[derive(Debug, Serialize, ToSchema)]
pub struct VehicleListResponse {
    /// Number of vehicles returned
    pub count: usize,

    /// The vehicles themselves, in the vehicle service's schema
    #[schema(value_type = Vec<Object>)]
    pub vehicles: Vec<Vehicle>,
}

impl From<Vec<Vehicle>> for VehicleListResponse {
    fn from(vehicles: Vec<Vehicle>) -> Self {
        Self {
            count: vehicles.len(),
            vehicles,
        }
    }
}
