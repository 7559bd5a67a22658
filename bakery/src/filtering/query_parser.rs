use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for filtering, pagination, and sorting list endpoints.
///
/// # Filtering
/// `filter` is a JSON object:
/// - free text search over the resource's searchable columns: `{"q": "كعك"}`
/// - by id or ids: `{"id": "550e8400-..."}`, `{"id": ["...", "..."]}`
/// - by column: `{"status": "pending", "area": "المزة"}`
/// - comparisons with `_gte`, `_lte`, `_gt`, `_lt`, `_neq` suffixes:
///   `{"delivery_date_gte": "2024-05-01", "total_eur_gt": 20}`
///
/// # Pagination
/// React Admin `range=[0,9]` or REST `page=1&per_page=10`.
///
/// # Sorting
/// `sort=["order_date","DESC"]`, `sort=order_date&order=DESC`
/// or `sort_by=order_date&order=DESC`.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct FilterOptions {
    /// JSON-encoded filter object.
    #[param(example = json!({"q": "خبز", "status": "pending"}))]
    pub filter: Option<String>,
    /// Range for pagination in the format "[start, end]".
    #[param(example = "[0,9]")]
    pub range: Option<String>,
    /// Page number for standard REST pagination (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of items per page for standard REST pagination.
    #[param(example = 10)]
    pub per_page: Option<u64>,
    /// Sort order in the format `["column", "order"]` or a plain column name.
    #[param(example = r#"["id", "ASC"]"#)]
    pub sort: Option<String>,
    /// Sort column for standard REST format.
    #[param(example = "name")]
    pub sort_by: Option<String>,
    /// Sort order for standard REST format (ASC or DESC).
    #[param(example = "ASC")]
    pub order: Option<String>,
}
