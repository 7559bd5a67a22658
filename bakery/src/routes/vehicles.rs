use axum::{
    Router,
    extract::{FromRef, State},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiError;
use crate::core::{CRUDResource, crud_router};
use crate::entities::vehicle::{self, Vehicle, VehicleOperations, VehicleStatus};
use crate::extract::{Json, Path};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    crud_router::<VehicleOperations>()
        .route("/maintenance-due", get(maintenance_due))
        .route("/{id}/maintenance", post(record_maintenance))
}

/// A completed service
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct MaintenanceRecord {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub mileage_km: Option<i32>,
    pub notes: Option<String>,
}

/// Vehicles in maintenance or whose next service falls inside the warning window
#[utoipa::path(
    get,
    path = "/api/vehicles/maintenance-due",
    responses((status = 200, description = "Vehicles needing service", body = [Vehicle])),
    tag = "vehicles"
)]
pub async fn maintenance_due(State(state): State<AppState>) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let ops = VehicleOperations::from_ref(&state);
    let today = Utc::now().date_naive();

    let rows = vehicle::Entity::find()
        .filter(
            Condition::any()
                .add(vehicle::Column::Status.eq(VehicleStatus::Maintenance))
                .add(
                    Condition::all()
                        .add(vehicle::Column::Status.ne(VehicleStatus::Inactive))
                        .add(vehicle::Column::NextMaintenanceDate.lte(ops.policy.due_cutoff(today))),
                ),
        )
        .order_by_asc(vehicle::Column::NextMaintenanceDate)
        .all(&state.db)
        .await
        .map_err(ApiError::database)?;

    Ok(Json(
        rows.into_iter()
            .map(|model| {
                let mut v = Vehicle::from(model);
                v.apply_policy(&ops.policy, today);
                v
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/vehicles/{id}/maintenance",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = MaintenanceRecord,
    responses(
        (status = 200, description = "Service recorded", body = Vehicle),
        (status = 400, description = "Future date or mileage going backwards"),
        (status = 404, description = "Unknown vehicle")
    ),
    tag = "vehicles"
)]
pub async fn record_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(record): Json<MaintenanceRecord>,
) -> Result<Json<Vehicle>, ApiError> {
    let ops = VehicleOperations::from_ref(&state);
    let today = Utc::now().date_naive();
    let serviced_on = record.date.unwrap_or(today);
    if serviced_on > today {
        return Err(ApiError::bad_request("تاريخ الصيانة لا يمكن أن يكون في المستقبل"));
    }

    let existing = vehicle::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::not_found(Vehicle::RESOURCE_LABEL, Some(id.to_string())))?;
    if record.mileage_km.is_some_and(|mileage| mileage < existing.mileage_km) {
        return Err(ApiError::bad_request(format!(
            "عداد المسافة لا يمكن أن يقل عن القراءة الحالية ({} كم)",
            existing.mileage_km
        )));
    }

    let plate = existing.plate_number.clone();
    let mut active = existing.into_active_model();
    active.last_maintenance_date = Set(Some(serviced_on));
    active.next_maintenance_date = Set(Some(ops.policy.next_after(serviced_on)));
    active.status = Set(VehicleStatus::Active);
    if let Some(mileage) = record.mileage_km {
        active.mileage_km = Set(mileage);
    }
    if let Some(notes) = record.notes.filter(|n| !n.trim().is_empty()) {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(ApiError::from)?;

    tracing::info!(%plate, %serviced_on, "Vehicle maintenance recorded");
    let mut vehicle = Vehicle::from(updated);
    vehicle.apply_policy(&ops.policy, today);
    Ok(Json(vehicle))
}
