//! # Auto-scheduling review
//!
//! Suggestions (order → distributor on a date, with a confidence score) come
//! from the external scoring service or are posted directly. Each one becomes a
//! pending [`SchedulingDraft`]; staff then approve, reject or modify it.
//! Approval and modification assign the order in the same transaction as the
//! review, subject to the distributor's daily capacity.
//!
//! A newer suggestion for the same order supersedes the older pending draft,
//! which is closed as rejected, flagged `superseded` and given the note
//! [`SUPERSEDED_NOTE`]. Statistics go by the flag, never by the note.

pub mod client;

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiError;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::entities::order::{self, OrderStatus};
use crate::entities::scheduling_draft::{self, DraftModification, DraftStatus, DraftSuggestion, SchedulingDraft};
use crate::entities::{store, user};
use crate::validation::{Validatable, ValidationErrors};

pub use client::{
    DistributorCandidate, HttpSuggestionSource, OrderCandidate, SchedulerError, SuggestionRequest, SuggestionSource,
};

pub const SUPERSEDED_NOTE: &str = "superseded";
pub const MAX_SUGGESTIONS_PER_REQUEST: usize = 100;
pub const MSG_ALREADY_REVIEWED: &str = "تمت مراجعة هذه المسودة مسبقاً";
pub const MSG_SCHEDULER_UNAVAILABLE: &str = "خدمة الجدولة التلقائية غير متاحة";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct IngestOutcome {
    pub created: Vec<SchedulingDraft>,
    pub superseded: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BulkApproveOutcome {
    pub approved: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DraftStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub modified: u64,
    pub superseded: u64,
    pub average_pending_confidence: Option<f64>,
    /// (approved + modified) / reviewed, superseded drafts excluded
    pub approval_rate: Option<f64>,
}

async fn find_draft<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<scheduling_draft::Model, ApiError> {
    scheduling_draft::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::not_found(SchedulingDraft::RESOURCE_LABEL, Some(id.to_string())))
}

async fn find_pending_draft<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<scheduling_draft::Model, ApiError> {
    let draft = find_draft(db, id).await?;
    if draft.status != DraftStatus::Pending {
        return Err(ApiError::bad_request(MSG_ALREADY_REVIEWED));
    }
    Ok(draft)
}

/// Checks that need the database: the order is still open and the distributor can drive.
async fn check_references<C: ConnectionTrait>(db: &C, suggestion: &DraftSuggestion) -> Result<(), ApiError> {
    let order = order::Entity::find_by_id(suggestion.order_id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::bad_request(format!("الطلب {} غير موجود", suggestion.order_id)))?;
    if !order.status.is_open() {
        return Err(ApiError::bad_request(format!(
            "الطلب {} غير متاح للجدولة ({})",
            order.order_number,
            order.status.label()
        )));
    }
    user::find_active_distributor(db, suggestion.suggested_distributor_id).await?;
    Ok(())
}

async fn supersede_pending<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<u64, ApiError> {
    let now = Utc::now();
    let result = scheduling_draft::Entity::update_many()
        .col_expr(scheduling_draft::Column::Status, Expr::value(DraftStatus::Rejected))
        .col_expr(scheduling_draft::Column::ReviewNotes, Expr::value(SUPERSEDED_NOTE))
        .col_expr(scheduling_draft::Column::Superseded, Expr::value(true))
        .col_expr(scheduling_draft::Column::ReviewedAt, Expr::value(now))
        .col_expr(scheduling_draft::Column::UpdatedAt, Expr::value(now))
        .filter(scheduling_draft::Column::OrderId.eq(order_id))
        .filter(scheduling_draft::Column::Status.eq(DraftStatus::Pending))
        .exec(db)
        .await
        .map_err(ApiError::database)?;
    Ok(result.rows_affected)
}

async fn store_suggestions(
    db: &DatabaseConnection,
    suggestions: Vec<DraftSuggestion>,
) -> Result<IngestOutcome, ApiError> {
    let txn = db.begin().await.map_err(ApiError::database)?;
    let mut outcome = IngestOutcome {
        created: Vec::with_capacity(suggestions.len()),
        superseded: 0,
    };
    for suggestion in suggestions {
        check_references(&txn, &suggestion).await?;
        outcome.superseded += supersede_pending(&txn, suggestion.order_id).await?;
        let active: scheduling_draft::ActiveModel = suggestion.into();
        let model = active.insert(&txn).await.map_err(ApiError::from)?;
        outcome.created.push(SchedulingDraft::from(model));
    }
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(
        created = outcome.created.len(),
        superseded = outcome.superseded,
        "Scheduling suggestions stored"
    );
    Ok(outcome)
}

/// Store a batch of suggestions as pending drafts, all or nothing.
///
/// # Errors
///
/// `BadRequest` for an empty or oversized batch, an invalid suggestion, a closed
/// order or an unusable distributor.
pub async fn ingest(db: &DatabaseConnection, suggestions: Vec<DraftSuggestion>) -> Result<IngestOutcome, ApiError> {
    if suggestions.is_empty() {
        return Err(ApiError::bad_request("لا توجد اقتراحات لإضافتها"));
    }
    if suggestions.len() > MAX_SUGGESTIONS_PER_REQUEST {
        return Err(ApiError::bad_request(format!(
            "لا يمكن إضافة أكثر من {MAX_SUGGESTIONS_PER_REQUEST} اقتراح في طلب واحد"
        )));
    }
    let mut errors = ValidationErrors::new();
    for suggestion in &suggestions {
        if let Err(invalid) = suggestion.validate() {
            for error in invalid.errors() {
                errors.add(error.clone());
            }
        }
    }
    errors.result()?;

    store_suggestions(db, suggestions).await
}

/// Open, unassigned orders due on `date` (or without a date) and the active
/// distributors with their load for that day.
///
/// # Errors
///
/// `Database` on query failure.
pub async fn build_request(db: &DatabaseConnection, date: NaiveDate) -> Result<SuggestionRequest, ApiError> {
    let orders = order::Entity::find()
        .filter(order::Column::Status.is_in(OrderStatus::OPEN))
        .filter(order::Column::DistributorId.is_null())
        .filter(
            Condition::any()
                .add(order::Column::DeliveryDate.eq(date))
                .add(order::Column::DeliveryDate.is_null()),
        )
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ApiError::database)?;

    let store_ids: Vec<Uuid> = orders.iter().map(|o| o.store_id).collect();
    let stores: std::collections::HashMap<Uuid, store::Model> = store::Entity::find()
        .filter(store::Column::Id.is_in(store_ids))
        .all(db)
        .await
        .map_err(ApiError::database)?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let distributors = user::Entity::find()
        .filter(user::Column::Role.eq(user::UserRole::Distributor))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await
        .map_err(ApiError::database)?;

    let mut distributor_candidates = Vec::with_capacity(distributors.len());
    for distributor in distributors {
        let assigned_orders = order::assigned_count(db, distributor.id, date, None).await?;
        distributor_candidates.push(DistributorCandidate {
            distributor_id: distributor.id,
            name: distributor.name,
            working_area: distributor.working_area,
            max_daily_orders: distributor.max_daily_orders,
            assigned_orders,
        });
    }

    Ok(SuggestionRequest {
        date,
        orders: orders
            .into_iter()
            .map(|o| {
                let store = stores.get(&o.store_id);
                OrderCandidate {
                    order_id: o.id,
                    order_number: o.order_number,
                    store_id: o.store_id,
                    area: store.map(|s| s.area.clone()),
                    priority: o.priority,
                    delivery_date: o.delivery_date,
                    total_eur: o.total_eur,
                    preferred_distributor_id: store.and_then(|s| s.preferred_distributor_id),
                }
            })
            .collect(),
        distributors: distributor_candidates,
    })
}

/// Ask the scoring service for suggestions for `date` and store the usable ones.
///
/// # Errors
///
/// `Unavailable` when no service is configured or the call fails.
pub async fn generate(
    db: &DatabaseConnection,
    source: Option<&dyn SuggestionSource>,
    date: NaiveDate,
) -> Result<IngestOutcome, ApiError> {
    let Some(source) = source else {
        return Err(ApiError::unavailable(MSG_SCHEDULER_UNAVAILABLE, None));
    };

    let request = build_request(db, date).await?;
    if request.orders.is_empty() || request.distributors.is_empty() {
        tracing::info!(%date, "Nothing to schedule");
        return Ok(IngestOutcome {
            created: Vec::new(),
            superseded: 0,
        });
    }

    let suggestions = source
        .suggest(&request)
        .await
        .map_err(|e| ApiError::unavailable(MSG_SCHEDULER_UNAVAILABLE, Some(e.to_string())))?;

    let known_orders: HashSet<Uuid> = request.orders.iter().map(|o| o.order_id).collect();
    let known_distributors: HashSet<Uuid> = request.distributors.iter().map(|d| d.distributor_id).collect();
    let received = suggestions.len();
    let usable: Vec<DraftSuggestion> = suggestions
        .into_iter()
        .filter(|s| {
            known_orders.contains(&s.order_id)
                && known_distributors.contains(&s.suggested_distributor_id)
                && s.validate().is_ok()
        })
        .collect();
    if usable.len() < received {
        tracing::warn!(received, kept = usable.len(), "Discarded unusable suggestions");
    }
    if usable.is_empty() {
        return Ok(IngestOutcome {
            created: Vec::new(),
            superseded: 0,
        });
    }

    store_suggestions(db, usable).await
}

/// Accept the suggestion as is.
///
/// # Errors
///
/// `NotFound`, `BadRequest` when already reviewed or the order cannot be
/// scheduled, `Conflict` when the distributor is fully booked.
pub async fn approve(db: &DatabaseConnection, id: Uuid, reviewer: Uuid) -> Result<SchedulingDraft, ApiError> {
    let txn = db.begin().await.map_err(ApiError::database)?;
    let draft = find_pending_draft(&txn, id).await?;
    order::assign(&txn, draft.order_id, draft.suggested_distributor_id, draft.suggested_date).await?;

    let now = Utc::now();
    let final_distributor = draft.suggested_distributor_id;
    let final_date = draft.suggested_date;
    let mut active = draft.into_active_model();
    active.status = Set(DraftStatus::Approved);
    active.final_distributor_id = Set(Some(final_distributor));
    active.final_date = Set(Some(final_date));
    active.reviewed_by = Set(Some(reviewer));
    active.reviewed_at = Set(Some(now));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await.map_err(ApiError::from)?;
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(draft = %id, %reviewer, "Scheduling draft approved");
    Ok(SchedulingDraft::from(updated))
}

/// # Errors
///
/// `BadRequest` without a reason or when already reviewed, `NotFound` for an unknown draft.
pub async fn reject(
    db: &DatabaseConnection,
    id: Uuid,
    reviewer: Uuid,
    reason: &str,
) -> Result<SchedulingDraft, ApiError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("سبب الرفض مطلوب"));
    }

    let draft = find_pending_draft(db, id).await?;
    let now = Utc::now();
    let mut active = draft.into_active_model();
    active.status = Set(DraftStatus::Rejected);
    active.review_notes = Set(Some(reason.to_string()));
    active.reviewed_by = Set(Some(reviewer));
    active.reviewed_at = Set(Some(now));
    active.updated_at = Set(now);
    let updated = active.update(db).await.map_err(ApiError::from)?;

    tracing::info!(draft = %id, %reviewer, "Scheduling draft rejected");
    Ok(SchedulingDraft::from(updated))
}

/// Apply the reviewer's distributor and date instead of the suggested ones.
///
/// # Errors
///
/// As [`approve`], plus validation errors on the modification.
pub async fn modify(
    db: &DatabaseConnection,
    id: Uuid,
    reviewer: Uuid,
    modification: DraftModification,
) -> Result<SchedulingDraft, ApiError> {
    modification.validate()?;

    let txn = db.begin().await.map_err(ApiError::database)?;
    let draft = find_pending_draft(&txn, id).await?;
    order::assign(&txn, draft.order_id, modification.distributor_id, modification.date).await?;

    let mut active = modification.merge_into_activemodel(draft.into_active_model())?;
    active.reviewed_by = Set(Some(reviewer));
    let updated = active.update(&txn).await.map_err(ApiError::from)?;
    txn.commit().await.map_err(ApiError::database)?;

    tracing::info!(draft = %id, %reviewer, "Scheduling draft modified");
    Ok(SchedulingDraft::from(updated))
}

/// Approve every pending draft matching the selection, highest confidence first.
/// Each draft is approved in its own transaction; failures are reported, not fatal.
///
/// # Errors
///
/// `BadRequest` for more than [`MAX_SUGGESTIONS_PER_REQUEST`] ids or a threshold
/// outside 0..=1, `Database` if the selection query fails.
pub async fn bulk_approve(
    db: &DatabaseConnection,
    ids: Option<Vec<Uuid>>,
    min_confidence: Option<f64>,
    reviewer: Uuid,
) -> Result<BulkApproveOutcome, ApiError> {
    if ids.as_ref().is_some_and(|ids| ids.len() > MAX_SUGGESTIONS_PER_REQUEST) {
        return Err(ApiError::bad_request(format!(
            "لا يمكن اعتماد أكثر من {MAX_SUGGESTIONS_PER_REQUEST} مسودة في طلب واحد"
        )));
    }
    if min_confidence.is_some_and(|threshold| !(0.0..=1.0).contains(&threshold)) {
        return Err(ApiError::bad_request("درجة الثقة يجب أن تكون بين 0 و 1"));
    }

    let mut query = scheduling_draft::Entity::find().filter(scheduling_draft::Column::Status.eq(DraftStatus::Pending));
    if let Some(ids) = &ids {
        query = query.filter(scheduling_draft::Column::Id.is_in(ids.clone()));
    }
    if let Some(threshold) = min_confidence {
        query = query.filter(scheduling_draft::Column::Confidence.gte(threshold));
    }
    let candidates = query
        .order_by_desc(scheduling_draft::Column::Confidence)
        .limit(MAX_SUGGESTIONS_PER_REQUEST as u64)
        .all(db)
        .await
        .map_err(ApiError::database)?;

    let mut outcome = BulkApproveOutcome::default();
    if let Some(ids) = &ids {
        let selected: HashSet<Uuid> = candidates.iter().map(|d| d.id).collect();
        for id in ids.iter().filter(|id| !selected.contains(id)) {
            outcome.failed.push(BulkFailure {
                id: *id,
                message: "المسودة غير متاحة للاعتماد".to_string(),
            });
        }
    }

    for draft in candidates {
        match approve(db, draft.id, reviewer).await {
            Ok(approved) => outcome.approved.push(approved.id),
            Err(err) => outcome.failed.push(BulkFailure {
                id: draft.id,
                message: err.user_message(),
            }),
        }
    }

    tracing::info!(
        approved = outcome.approved.len(),
        failed = outcome.failed.len(),
        "Bulk approval finished"
    );
    Ok(outcome)
}

/// # Errors
///
/// `Database` on query failure.
pub async fn stats(db: &DatabaseConnection) -> Result<DraftStats, ApiError> {
    let count_status = |status: DraftStatus| {
        scheduling_draft::Entity::find()
            .filter(scheduling_draft::Column::Status.eq(status))
            .count(db)
    };

    let pending = count_status(DraftStatus::Pending).await.map_err(ApiError::database)?;
    let approved = count_status(DraftStatus::Approved).await.map_err(ApiError::database)?;
    let rejected_all = count_status(DraftStatus::Rejected).await.map_err(ApiError::database)?;
    let modified = count_status(DraftStatus::Modified).await.map_err(ApiError::database)?;
    let superseded = scheduling_draft::Entity::find()
        .filter(scheduling_draft::Column::Status.eq(DraftStatus::Rejected))
        .filter(scheduling_draft::Column::Superseded.eq(true))
        .count(db)
        .await
        .map_err(ApiError::database)?;
    let rejected = rejected_all.saturating_sub(superseded);

    let pending_confidences: Vec<f64> = scheduling_draft::Entity::find()
        .select_only()
        .column(scheduling_draft::Column::Confidence)
        .filter(scheduling_draft::Column::Status.eq(DraftStatus::Pending))
        .into_tuple()
        .all(db)
        .await
        .map_err(ApiError::database)?;

    Ok(summarize(pending, approved, rejected, modified, superseded, &pending_confidences))
}

#[allow(clippy::cast_precision_loss)]
fn summarize(
    pending: u64,
    approved: u64,
    rejected: u64,
    modified: u64,
    superseded: u64,
    pending_confidences: &[f64],
) -> DraftStats {
    let average_pending_confidence = if pending_confidences.is_empty() {
        None
    } else {
        let mean = pending_confidences.iter().sum::<f64>() / pending_confidences.len() as f64;
        Some((mean * 1000.0).round() / 1000.0)
    };
    let reviewed = approved + modified + rejected;
    let approval_rate = (reviewed > 0).then(|| ((approved + modified) as f64 / reviewed as f64 * 1000.0).round() / 1000.0);

    DraftStats {
        total: pending + approved + rejected + modified + superseded,
        pending,
        approved,
        rejected,
        modified,
        superseded,
        average_pending_confidence,
        approval_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rates() {
        let stats = summarize(2, 3, 1, 1, 4, &[0.9, 0.6]);
        assert_eq!(stats.total, 11);
        assert_eq!(stats.average_pending_confidence, Some(0.75));
        assert_eq!(stats.approval_rate, Some(0.8));
    }

    #[test]
    fn test_summary_without_reviews() {
        let stats = summarize(0, 0, 0, 0, 0, &[]);
        assert_eq!(stats.average_pending_confidence, None);
        assert_eq!(stats.approval_rate, None);
    }
}
