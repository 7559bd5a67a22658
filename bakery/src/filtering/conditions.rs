use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseBackend, Value,
    sea_query::{Expr, Func, SimpleExpr},
};
use std::collections::HashMap;
use uuid::Uuid;

use super::query_parser::FilterOptions;
use super::search::{build_fulltext_condition, build_like_condition};
use crate::core::CRUDResource;

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 1_000;

/// Basic field name validation
fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty()
        && field_name.len() <= 100
        && !field_name.starts_with('_')
        && !field_name.contains("..")
}

/// Basic value length check
const fn validate_field_value(value: &str) -> bool {
    value.len() <= MAX_FIELD_VALUE_LENGTH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gte,
    Lte,
    Gt,
    Lt,
    Neq,
}

/// Split a React Admin comparison suffix off a filter key.
/// Returns `(base_field_name, comparison)` if a suffix is found.
fn parse_comparison_operator(field_name: &str) -> Option<(&str, Comparison)> {
    const SUFFIXES: [(&str, Comparison); 5] = [
        ("_gte", Comparison::Gte),
        ("_lte", Comparison::Lte),
        ("_neq", Comparison::Neq),
        ("_gt", Comparison::Gt),
        ("_lt", Comparison::Lt),
    ];
    SUFFIXES
        .iter()
        .find_map(|(suffix, op)| field_name.strip_suffix(suffix).map(|base| (base, *op)))
}

fn compare<C: ColumnTrait, V: Into<Value>>(column: C, op: Comparison, value: V) -> SimpleExpr {
    match op {
        Comparison::Gte => column.gte(value),
        Comparison::Lte => column.lte(value),
        Comparison::Gt => column.gt(value),
        Comparison::Lt => column.lt(value),
        Comparison::Neq => column.ne(value),
    }
}

/// Typed value for a string that looks like a UUID, a date or a timestamp.
fn typed_string_value(value: &str) -> Value {
    if let Ok(uuid) = Uuid::parse_str(value) {
        return uuid.into();
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.into();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return ts.with_timezone(&Utc).into();
    }
    value.to_string().into()
}

fn parse_filter_json(filter_str: Option<&str>) -> HashMap<String, serde_json::Value> {
    filter_str.map_or_else(HashMap::new, |filter| match serde_json::from_str(filter) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid JSON in filter parameter");
            HashMap::new()
        }
    })
}

fn handle_fulltext_search<T: CRUDResource>(
    filters: &HashMap<String, serde_json::Value>,
    columns: &[(&str, T::ColumnType)],
    backend: DatabaseBackend,
) -> Option<Condition> {
    let query = filters.get("q")?.as_str()?.trim();
    if query.is_empty() || !validate_field_value(query) {
        return None;
    }

    if let Some(fulltext_expr) = build_fulltext_condition::<T>(query, backend) {
        return Some(Condition::all().add(fulltext_expr));
    }

    // Without fulltext columns, search the LIKE-filterable ones
    let like_columns = T::like_filterable_columns();
    let mut any = Condition::any();
    for (name, _) in columns.iter().filter(|(name, _)| like_columns.contains(name)) {
        any = any.add(build_like_condition(name, query));
    }
    if any.is_empty() { None } else { Some(any) }
}

fn process_string_filter<T: CRUDResource>(
    key: &str,
    string_value: &str,
    column: T::ColumnType,
) -> Option<SimpleExpr> {
    if !validate_field_value(string_value) {
        return None;
    }

    let trimmed_value = string_value.trim();
    if trimmed_value.is_empty() {
        return None;
    }

    if T::like_filterable_columns().contains(&key) {
        return Some(build_like_condition(key, trimmed_value));
    }

    if T::is_enum_field(key) {
        return Some(
            Expr::expr(Func::upper(Expr::col(column))).eq(trimmed_value.to_uppercase()),
        );
    }

    match typed_string_value(trimmed_value) {
        Value::String(_) => {
            // Case-insensitive string equality
            Some(Expr::expr(Func::upper(Expr::col(column))).eq(trimmed_value.to_uppercase()))
        }
        typed => Some(column.eq(typed)),
    }
}

fn process_number_filter(number: &serde_json::Number, column: impl ColumnTrait) -> Option<SimpleExpr> {
    if let Some(int_value) = number.as_i64() {
        Some(column.eq(int_value))
    } else {
        number.as_f64().map(|float_value| column.eq(float_value))
    }
}

fn process_comparison_filter(
    value: &serde_json::Value,
    op: Comparison,
    column: impl ColumnTrait,
) -> Option<SimpleExpr> {
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int_value) = number.as_i64() {
                Some(compare(column, op, int_value))
            } else {
                number.as_f64().map(|float_value| compare(column, op, float_value))
            }
        }
        serde_json::Value::String(s) if !s.trim().is_empty() && validate_field_value(s) => {
            Some(compare(column, op, typed_string_value(s.trim())))
        }
        _ => None,
    }
}

fn process_array_filter(array_values: &[serde_json::Value], column: impl ColumnTrait) -> Option<SimpleExpr> {
    let values: Vec<Value> = array_values
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(typed_string_value(s.trim())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::from)
                .or_else(|| n.as_f64().map(Value::from)),
            serde_json::Value::Bool(b) => Some(Value::from(*b)),
            _ => None,
        })
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(column.is_in(values))
}

/// Translate the JSON `filter` parameter into a condition over `columns`.
/// Keys that are not filterable are ignored.
pub fn apply_filters<T: CRUDResource>(
    filter_str: Option<&str>,
    columns: &[(&str, T::ColumnType)],
    backend: DatabaseBackend,
) -> Condition {
    let filters = parse_filter_json(filter_str);
    let mut condition = Condition::all();

    if let Some(fulltext_condition) = handle_fulltext_search::<T>(&filters, columns, backend) {
        condition = condition.add(fulltext_condition);
    }

    for (key, value) in &filters {
        if key == "q" || !is_valid_field_name(key) {
            continue;
        }

        let find_column = |name: &str| {
            columns
                .iter()
                .find(|(col_name, _)| *col_name == name)
                .map(|(_, col)| *col)
        };

        let filter_expr = if let Some(column) = find_column(key) {
            match value {
                serde_json::Value::String(string_value) => {
                    process_string_filter::<T>(key, string_value, column)
                }
                serde_json::Value::Number(number) => process_number_filter(number, column),
                serde_json::Value::Bool(bool_value) => Some(column.eq(*bool_value)),
                serde_json::Value::Array(array_values) => process_array_filter(array_values, column),
                serde_json::Value::Null => Some(column.is_null()),
                serde_json::Value::Object(_) => None,
            }
        } else if let Some((base_field, op)) = parse_comparison_operator(key) {
            find_column(base_field).and_then(|column| process_comparison_filter(value, op, column))
        } else {
            None
        };

        if let Some(filter_expr) = filter_expr {
            condition = condition.add(filter_expr);
        }
    }

    condition
}

/// Parse a React Admin `[start, end]` range. Invalid input yields the first page.
#[must_use]
pub fn parse_range(range_str: Option<&str>) -> (u64, u64) {
    range_str.map_or((0, DEFAULT_PAGE_SIZE - 1), |r| {
        serde_json::from_str::<[u64; 2]>(r)
            .map(|range| (range[0], range[1]))
            .unwrap_or((0, DEFAULT_PAGE_SIZE - 1))
    })
}

/// Returns `(offset, limit)`, with the limit capped at [`MAX_PAGE_SIZE`].
#[must_use]
pub fn parse_pagination(params: &FilterOptions) -> (u64, u64) {
    let (offset, limit) = if let (Some(page), Some(per_page)) = (params.page, params.per_page) {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        (page.saturating_sub(1).saturating_mul(per_page), per_page)
    } else if let Some(range) = &params.range {
        let (start, end) = parse_range(Some(range));
        (start, end.saturating_sub(start).saturating_add(1))
    } else {
        (0, DEFAULT_PAGE_SIZE)
    };
    (offset, limit.clamp(1, MAX_PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison_operator() {
        assert_eq!(
            parse_comparison_operator("delivery_date_gte"),
            Some(("delivery_date", Comparison::Gte))
        );
        assert_eq!(parse_comparison_operator("total_eur_lt"), Some(("total_eur", Comparison::Lt)));
        assert_eq!(parse_comparison_operator("status_neq"), Some(("status", Comparison::Neq)));
        assert_eq!(parse_comparison_operator("status"), None);
    }

    #[test]
    fn test_typed_string_value() {
        assert!(matches!(
            typed_string_value("550e8400-e29b-41d4-a716-446655440000"),
            Value::Uuid(_)
        ));
        assert!(matches!(typed_string_value("2024-05-01"), Value::ChronoDate(_)));
        assert!(matches!(typed_string_value("خبز"), Value::String(_)));
    }

    #[test]
    fn test_field_name_validation() {
        assert!(is_valid_field_name("plate_number"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("_hidden"));
        assert!(!is_valid_field_name("a..b"));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range(Some("[10,19]")), (10, 19));
        assert_eq!(parse_range(Some("garbage")), (0, 9));
        assert_eq!(parse_range(None), (0, 9));
    }

    #[test]
    fn test_parse_pagination_formats() {
        let rest = FilterOptions {
            page: Some(3),
            per_page: Some(20),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&rest), (40, 20));

        let react_admin = FilterOptions {
            range: Some("[5,14]".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&react_admin), (5, 10));

        assert_eq!(parse_pagination(&FilterOptions::default()), (0, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_parse_pagination_caps_page_size() {
        let huge = FilterOptions {
            range: Some("[0,999999]".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&huge), (0, MAX_PAGE_SIZE));

        let zero = FilterOptions {
            page: Some(0),
            per_page: Some(0),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&zero), (0, 1));
    }
}
