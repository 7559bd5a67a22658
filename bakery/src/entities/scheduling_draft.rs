//! Suggested order assignments waiting for a staff decision.

use async_trait::async_trait;
use axum::extract::FromRef;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue::Set, DeriveActiveEnum, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::operations::CRUDOperations;
use crate::state::AppState;
use crate::validation::{Validatable, ValidationError, ValidationErrors, validators};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "modified")]
    Modified,
}

impl DraftStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "بانتظار المراجعة",
            Self::Approved => "موافق عليها",
            Self::Rejected => "مرفوضة",
            Self::Modified => "معدلة",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn from_score(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "ثقة عالية",
            Self::Medium => "ثقة متوسطة",
            Self::Low => "ثقة منخفضة",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scheduling_drafts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub suggested_distributor_id: Uuid,
    pub suggested_date: NaiveDate,
    pub confidence: f64,
    pub reasons: Option<String>,
    pub source: Option<String>,
    pub status: DraftStatus,
    pub final_distributor_id: Option<Uuid>,
    pub final_date: Option<NaiveDate>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    /// Closed because a newer suggestion arrived for the same order
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SchedulingDraft {
    pub id: Uuid,
    pub order_id: Uuid,
    pub suggested_distributor_id: Uuid,
    pub suggested_date: NaiveDate,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub confidence_label: String,
    pub reasons: Option<String>,
    pub source: Option<String>,
    pub status: DraftStatus,
    pub status_label: String,
    pub final_distributor_id: Option<Uuid>,
    pub final_date: Option<NaiveDate>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for SchedulingDraft {
    fn from(model: Model) -> Self {
        let level = ConfidenceLevel::from_score(model.confidence);
        Self {
            id: model.id,
            order_id: model.order_id,
            suggested_distributor_id: model.suggested_distributor_id,
            suggested_date: model.suggested_date,
            confidence: model.confidence,
            confidence_level: level,
            confidence_label: level.label().to_string(),
            reasons: model.reasons,
            source: model.source,
            status: model.status,
            status_label: model.status.label().to_string(),
            final_distributor_id: model.final_distributor_id,
            final_date: model.final_date,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at,
            review_notes: model.review_notes,
            superseded: model.superseded,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One suggestion as produced by the scoring service or posted by a client
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DraftSuggestion {
    pub order_id: Uuid,
    pub suggested_distributor_id: Uuid,
    pub suggested_date: NaiveDate,
    pub confidence: f64,
    pub reasons: Option<String>,
    pub source: Option<String>,
}

impl From<DraftSuggestion> for ActiveModel {
    fn from(suggestion: DraftSuggestion) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            order_id: Set(suggestion.order_id),
            suggested_distributor_id: Set(suggestion.suggested_distributor_id),
            suggested_date: Set(suggestion.suggested_date),
            confidence: Set(suggestion.confidence),
            reasons: Set(suggestion.reasons),
            source: Set(suggestion.source),
            status: Set(DraftStatus::Pending),
            final_distributor_id: Set(None),
            final_date: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_notes: Set(None),
            superseded: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for DraftSuggestion {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            errors.add(ValidationError::new("confidence", "درجة الثقة يجب أن تكون بين 0 و 1"));
        }
        if let Some(reasons) = &self.reasons {
            errors.check(validators::validate_length("reasons", "أسباب الاقتراح", reasons, None, Some(2000)));
        }
        errors.result()
    }
}

/// The reviewer's alternative to a suggestion
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct DraftModification {
    pub distributor_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for DraftModification {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        let now = Utc::now();
        existing.final_distributor_id = Set(Some(self.distributor_id));
        existing.final_date = Set(Some(self.date));
        existing.review_notes = Set(self.notes);
        existing.status = Set(DraftStatus::Modified);
        existing.reviewed_at = Set(Some(now));
        existing.updated_at = Set(now);
        Ok(existing)
    }
}

impl Validatable for DraftModification {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(notes) = &self.notes {
            errors.check(validators::validate_length("notes", "الملاحظات", notes, None, Some(1000)));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for SchedulingDraft {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = DraftSuggestion;
    type UpdateModel = DraftModification;
    type ListModel = SchedulingDraft;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "scheduling_draft";
    const RESOURCE_NAME_PLURAL: &'static str = "scheduling_drafts";
    const RESOURCE_LABEL: &'static str = "مسودة الجدولة";

    fn default_index_column() -> Self::ColumnType {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("confidence", Column::Confidence),
            ("suggested_date", Column::SuggestedDate),
            ("status", Column::Status),
            ("reviewed_at", Column::ReviewedAt),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("order_id", Column::OrderId),
            ("suggested_distributor_id", Column::SuggestedDistributorId),
            ("suggested_date", Column::SuggestedDate),
            ("confidence", Column::Confidence),
            ("status", Column::Status),
            ("source", Column::Source),
        ]
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "status"
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("reasons", Column::Reasons), ("review_notes", Column::ReviewNotes)]
    }
}

#[derive(Clone, Copy, Default)]
pub struct DraftOperations;

impl FromRef<AppState> for DraftOperations {
    fn from_ref(_: &AppState) -> Self {
        Self
    }
}

#[async_trait]
impl CRUDOperations for DraftOperations {
    type Resource = SchedulingDraft;
}
