//! Delivery vehicles and their maintenance schedule.

use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DeriveActiveEnum, EntityTrait,
    PaginatorTrait, QueryFilter, entity::prelude::*, sea_query::StringLen,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user;
use crate::ApiError;
use crate::config::Config;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::{Validatable, ValidationErrors, validators};

pub const MSG_DUPLICATE_PLATE: &str = "رقم اللوحة مستخدم مسبقاً";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[sea_orm(string_value = "van")]
    Van,
    #[sea_orm(string_value = "truck")]
    Truck,
    #[sea_orm(string_value = "pickup")]
    Pickup,
    #[sea_orm(string_value = "motorcycle")]
    Motorcycle,
    #[sea_orm(string_value = "refrigerated_truck")]
    RefrigeratedTruck,
}

impl VehicleType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Van => "فان",
            Self::Truck => "شاحنة",
            Self::Pickup => "بيك آب",
            Self::Motorcycle => "دراجة نارية",
            Self::RefrigeratedTruck => "شاحنة مبردة",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl VehicleStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "نشطة",
            Self::Maintenance => "في الصيانة",
            Self::Inactive => "غير نشطة",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub capacity_kg: Decimal,
    pub status: VehicleStatus,
    pub distributor_id: Option<Uuid>,
    pub mileage_km: i32,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub insurance_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Service interval and how early a vehicle is flagged before it is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenancePolicy {
    pub interval_days: i64,
    pub warning_days: i64,
}

impl Default for MaintenancePolicy {
    fn default() -> Self {
        Self {
            interval_days: 90,
            warning_days: 7,
        }
    }
}

/// Saturates at the calendar's last day instead of panicking
fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|span| date.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX)
}

impl MaintenancePolicy {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            interval_days: config.maintenance_interval_days,
            warning_days: config.maintenance_warning_days,
        }
    }

    #[must_use]
    pub fn next_after(&self, serviced_on: NaiveDate) -> NaiveDate {
        add_days(serviced_on, self.interval_days)
    }

    /// Last day that still counts as due: anything scheduled on or before it is flagged
    #[must_use]
    pub fn due_cutoff(&self, today: NaiveDate) -> NaiveDate {
        add_days(today, self.warning_days)
    }

    #[must_use]
    pub fn is_due(&self, status: VehicleStatus, next: Option<NaiveDate>, today: NaiveDate) -> bool {
        status == VehicleStatus::Maintenance || next.is_some_and(|date| date <= self.due_cutoff(today))
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub type_label: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub capacity_kg: Decimal,
    pub status: VehicleStatus,
    pub status_label: String,
    pub distributor_id: Option<Uuid>,
    pub mileage_km: i32,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub insurance_expiry: Option<NaiveDate>,
    pub maintenance_due: bool,
    /// Negative when the service is overdue
    pub days_until_maintenance: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Recompute the maintenance flags against `policy` as of `today`.
    pub fn apply_policy(&mut self, policy: &MaintenancePolicy, today: NaiveDate) {
        self.days_until_maintenance = self.next_maintenance_date.map(|next| (next - today).num_days());
        self.maintenance_due = policy.is_due(self.status, self.next_maintenance_date, today);
    }
}

impl From<Model> for Vehicle {
    fn from(model: Model) -> Self {
        let mut vehicle = Self {
            id: model.id,
            plate_number: model.plate_number,
            vehicle_type: model.vehicle_type,
            type_label: model.vehicle_type.label().to_string(),
            brand: model.brand,
            model: model.model,
            year: model.year,
            capacity_kg: model.capacity_kg,
            status: model.status,
            status_label: model.status.label().to_string(),
            distributor_id: model.distributor_id,
            mileage_km: model.mileage_km,
            last_maintenance_date: model.last_maintenance_date,
            next_maintenance_date: model.next_maintenance_date,
            insurance_expiry: model.insurance_expiry,
            maintenance_due: false,
            days_until_maintenance: None,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        };
        vehicle.apply_policy(&MaintenancePolicy::default(), Utc::now().date_naive());
        vehicle
    }
}

/// Plates are compared and stored trimmed and upper-cased
#[must_use]
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct VehicleCreate {
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub capacity_kg: Option<Decimal>,
    pub status: Option<VehicleStatus>,
    pub distributor_id: Option<Uuid>,
    pub mileage_km: Option<i32>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub insurance_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl From<VehicleCreate> for ActiveModel {
    fn from(create: VehicleCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            plate_number: Set(normalize_plate(&create.plate_number)),
            vehicle_type: Set(create.vehicle_type),
            brand: Set(create.brand),
            model: Set(create.model),
            year: Set(create.year),
            capacity_kg: Set(create.capacity_kg.unwrap_or_default()),
            status: Set(create.status.unwrap_or(VehicleStatus::Active)),
            distributor_id: Set(create.distributor_id),
            mileage_km: Set(create.mileage_km.unwrap_or(0)),
            last_maintenance_date: Set(create.last_maintenance_date),
            next_maintenance_date: Set(create.next_maintenance_date),
            insurance_expiry: Set(create.insurance_expiry),
            notes: Set(create.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_year(errors: &mut ValidationErrors, year: i32) {
    let next_year = Utc::now().year() + 1;
    errors.check(validators::validate_range("year", "سنة الصنع", year, Some(1950), Some(next_year)));
}

fn validate_plate(errors: &mut ValidationErrors, plate: &str) {
    errors.check(validators::validate_required("plate_number", "رقم اللوحة", plate));
    errors.check(validators::validate_length("plate_number", "رقم اللوحة", plate, None, Some(20)));
}

impl Validatable for VehicleCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_plate(&mut errors, &self.plate_number);
        if let Some(year) = self.year {
            validate_year(&mut errors, year);
        }
        if let Some(capacity) = self.capacity_kg {
            errors.check(validators::validate_non_negative("capacity_kg", "الحمولة", capacity));
        }
        if let Some(mileage) = self.mileage_km {
            errors.check(validators::validate_range("mileage_km", "عداد المسافة", mileage, Some(0), None));
        }
        errors.result()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct VehicleUpdate {
    pub plate_number: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub brand: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub model: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub year: Option<Option<i32>>,
    pub capacity_kg: Option<Decimal>,
    pub status: Option<VehicleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub distributor_id: Option<Option<Uuid>>,
    pub mileage_km: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub last_maintenance_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub next_maintenance_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub insurance_expiry: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for VehicleUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(plate) = self.plate_number {
            existing.plate_number = Set(normalize_plate(&plate));
        }
        if let Some(vehicle_type) = self.vehicle_type {
            existing.vehicle_type = Set(vehicle_type);
        }
        if let Some(brand) = self.brand {
            existing.brand = Set(brand);
        }
        if let Some(model) = self.model {
            existing.model = Set(model);
        }
        if let Some(year) = self.year {
            existing.year = Set(year);
        }
        if let Some(capacity) = self.capacity_kg {
            existing.capacity_kg = Set(capacity);
        }
        if let Some(status) = self.status {
            existing.status = Set(status);
        }
        if let Some(distributor_id) = self.distributor_id {
            existing.distributor_id = Set(distributor_id);
        }
        if let Some(mileage) = self.mileage_km {
            existing.mileage_km = Set(mileage);
        }
        if let Some(date) = self.last_maintenance_date {
            existing.last_maintenance_date = Set(date);
        }
        if let Some(date) = self.next_maintenance_date {
            existing.next_maintenance_date = Set(date);
        }
        if let Some(date) = self.insurance_expiry {
            existing.insurance_expiry = Set(date);
        }
        if let Some(notes) = self.notes {
            existing.notes = Set(notes);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for VehicleUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(plate) = &self.plate_number {
            validate_plate(&mut errors, plate);
        }
        if let Some(Some(year)) = self.year {
            validate_year(&mut errors, year);
        }
        if let Some(capacity) = self.capacity_kg {
            errors.check(validators::validate_non_negative("capacity_kg", "الحمولة", capacity));
        }
        if let Some(mileage) = self.mileage_km {
            errors.check(validators::validate_range("mileage_km", "عداد المسافة", mileage, Some(0), None));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Vehicle {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = VehicleCreate;
    type UpdateModel = VehicleUpdate;
    type ListModel = Vehicle;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "vehicle";
    const RESOURCE_NAME_PLURAL: &'static str = "vehicles";
    const RESOURCE_LABEL: &'static str = "المركبة";

    fn default_index_column() -> Self::ColumnType {
        Column::PlateNumber
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("plate_number", Column::PlateNumber),
            ("vehicle_type", Column::VehicleType),
            ("status", Column::Status),
            ("year", Column::Year),
            ("capacity_kg", Column::CapacityKg),
            ("mileage_km", Column::MileageKm),
            ("next_maintenance_date", Column::NextMaintenanceDate),
            ("insurance_expiry", Column::InsuranceExpiry),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("plate_number", Column::PlateNumber),
            ("vehicle_type", Column::VehicleType),
            ("brand", Column::Brand),
            ("status", Column::Status),
            ("distributor_id", Column::DistributorId),
            ("year", Column::Year),
            ("mileage_km", Column::MileageKm),
            ("next_maintenance_date", Column::NextMaintenanceDate),
            ("insurance_expiry", Column::InsuranceExpiry),
        ]
    }

    fn is_enum_field(field_name: &str) -> bool {
        matches!(field_name, "vehicle_type" | "status")
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["plate_number", "brand"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("plate_number", Column::PlateNumber),
            ("brand", Column::Brand),
            ("model", Column::Model),
        ]
    }
}

#[derive(Clone, Copy)]
pub struct VehicleOperations {
    pub policy: MaintenancePolicy,
}

impl FromRef<AppState> for VehicleOperations {
    fn from_ref(state: &AppState) -> Self {
        Self {
            policy: MaintenancePolicy::from_config(&state.config),
        }
    }
}

impl VehicleOperations {
    async fn ensure_plate_available(
        db: &DatabaseConnection,
        plate: &str,
        except: Option<Uuid>,
    ) -> Result<(), ApiError> {
        let mut query = Entity::find().filter(Column::PlateNumber.eq(normalize_plate(plate)));
        if let Some(id) = except {
            query = query.filter(Column::Id.ne(id));
        }
        if query.count(db).await.map_err(ApiError::database)? > 0 {
            tracing::warn!(plate = %normalize_plate(plate), "Rejected duplicate plate number");
            return Err(ApiError::conflict(MSG_DUPLICATE_PLATE));
        }
        Ok(())
    }

    /// The driver must be an active distributor without another vehicle
    async fn ensure_distributor_free(
        db: &DatabaseConnection,
        distributor_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<(), ApiError> {
        user::find_active_distributor(db, distributor_id).await?;
        let mut query = Entity::find().filter(Column::DistributorId.eq(distributor_id));
        if let Some(id) = except {
            query = query.filter(Column::Id.ne(id));
        }
        if query.count(db).await.map_err(ApiError::database)? > 0 {
            return Err(ApiError::conflict("الموزع لديه مركبة مسجلة مسبقاً"));
        }
        Ok(())
    }
}

#[async_trait]
impl CRUDOperations for VehicleOperations {
    type Resource = Vehicle;

    async fn after_get_one(&self, _db: &DatabaseConnection, entity: &mut Vehicle) -> Result<(), ApiError> {
        entity.apply_policy(&self.policy, Utc::now().date_naive());
        Ok(())
    }

    async fn after_get_all(&self, _db: &DatabaseConnection, entities: &mut Vec<Vehicle>) -> Result<(), ApiError> {
        let today = Utc::now().date_naive();
        for vehicle in entities.iter_mut() {
            vehicle.apply_policy(&self.policy, today);
        }
        Ok(())
    }

    async fn before_create(&self, db: &DatabaseConnection, data: &VehicleCreate) -> Result<(), ApiError> {
        Self::ensure_plate_available(db, &data.plate_number, None).await?;
        if let Some(distributor_id) = data.distributor_id {
            Self::ensure_distributor_free(db, distributor_id, None).await?;
        }
        Ok(())
    }

    /// A vehicle with a known service date but no next date gets one from the interval
    async fn perform_create(&self, db: &DatabaseConnection, data: VehicleCreate) -> Result<Vehicle, ApiError> {
        let next = match (data.last_maintenance_date, data.next_maintenance_date) {
            (Some(last), None) => Some(self.policy.next_after(last)),
            (_, next) => next,
        };
        let mut active: ActiveModel = data.into();
        active.next_maintenance_date = Set(next);
        let model = active.insert(db).await.map_err(ApiError::from)?;
        Ok(Vehicle::from(model))
    }

    async fn after_create(&self, _db: &DatabaseConnection, entity: &mut Vehicle) -> Result<(), ApiError> {
        entity.apply_policy(&self.policy, Utc::now().date_naive());
        tracing::info!(plate = %entity.plate_number, "Vehicle registered");
        Ok(())
    }

    async fn before_update(&self, db: &DatabaseConnection, id: Uuid, data: &VehicleUpdate) -> Result<(), ApiError> {
        if let Some(plate) = &data.plate_number {
            Self::ensure_plate_available(db, plate, Some(id)).await?;
        }
        if let Some(Some(distributor_id)) = data.distributor_id {
            Self::ensure_distributor_free(db, distributor_id, Some(id)).await?;
        }
        Ok(())
    }

    async fn after_update(&self, _db: &DatabaseConnection, entity: &mut Vehicle) -> Result<(), ApiError> {
        entity.apply_policy(&self.policy, Utc::now().date_naive());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("  dm-1234 "), "DM-1234");
    }

    #[test]
    fn test_maintenance_due_window() {
        let policy = MaintenancePolicy::default();
        let today = date(2024, 5, 1);
        assert!(policy.is_due(VehicleStatus::Active, Some(date(2024, 5, 8)), today));
        assert!(policy.is_due(VehicleStatus::Active, Some(date(2024, 4, 20)), today));
        assert!(!policy.is_due(VehicleStatus::Active, Some(date(2024, 5, 9)), today));
        assert!(!policy.is_due(VehicleStatus::Active, None, today));
        assert!(policy.is_due(VehicleStatus::Maintenance, None, today));
    }

    #[test]
    fn test_next_after_uses_interval() {
        let policy = MaintenancePolicy {
            interval_days: 30,
            warning_days: 3,
        };
        assert_eq!(policy.next_after(date(2024, 1, 15)), date(2024, 2, 14));
    }

    #[test]
    fn test_huge_intervals_saturate() {
        let policy = MaintenancePolicy {
            interval_days: i64::MAX,
            warning_days: i64::MAX,
        };
        let today = date(2024, 5, 1);
        assert_eq!(policy.next_after(today), NaiveDate::MAX);
        assert_eq!(policy.due_cutoff(today), NaiveDate::MAX);
        assert!(policy.is_due(VehicleStatus::Active, Some(date(2030, 1, 1)), today));
    }

    #[test]
    fn test_labels_are_arabic() {
        assert_eq!(VehicleType::RefrigeratedTruck.label(), "شاحنة مبردة");
        assert_eq!(VehicleStatus::Maintenance.label(), "في الصيانة");
    }

    #[test]
    fn test_create_validation_collects_errors() {
        let payload = VehicleCreate {
            plate_number: "  ".into(),
            vehicle_type: VehicleType::Van,
            brand: None,
            model: None,
            year: Some(1900),
            capacity_kg: Some(Decimal::new(-5, 0)),
            status: None,
            distributor_id: None,
            mileage_km: Some(-1),
            last_maintenance_date: None,
            next_maintenance_date: None,
            insurance_expiry: None,
            notes: None,
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
