use sea_orm::{ColumnTrait, sea_query::Order};

use super::query_parser::FilterOptions;

const DEFAULT_SORT_ORDER: &str = "ASC";

/// Parse sort column and order from JSON array format
fn parse_json_sort(json: &str) -> (Option<String>, String) {
    let sort_vec: Vec<String> = serde_json::from_str(json).unwrap_or_default();
    (
        sort_vec.first().cloned(),
        sort_vec
            .get(1)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SORT_ORDER.to_string()),
    )
}

/// Convert sort order string to Order enum; anything but ASC sorts descending
fn parse_order(sort_order: &str) -> Order {
    if sort_order.eq_ignore_ascii_case("ASC") {
        Order::Asc
    } else {
        Order::Desc
    }
}

/// Find column by name or return default
fn find_column<C>(column_name: Option<&str>, columns: &[(&str, C)], default: C) -> C
where
    C: ColumnTrait + Copy,
{
    column_name
        .and_then(|name| columns.iter().find(|&&(col_name, _)| col_name == name))
        .map_or(default, |&(_, col)| col)
}

/// Parse sorting from `FilterOptions`, supporting both React Admin and standard REST formats.
/// Unknown columns fall back to `default_column`.
pub fn parse_sorting<C>(params: &FilterOptions, sortable: &[(&str, C)], default_column: C) -> (C, Order)
where
    C: ColumnTrait + Copy,
{
    let order_param = || {
        params
            .order
            .clone()
            .unwrap_or_else(|| DEFAULT_SORT_ORDER.to_string())
    };

    let (sort_column, sort_order) = if let Some(sort_by) = &params.sort_by {
        (Some(sort_by.clone()), order_param())
    } else if let Some(sort) = &params.sort {
        if sort.starts_with('[') {
            parse_json_sort(sort)
        } else {
            (Some(sort.clone()), order_param())
        }
    } else {
        (None, order_param())
    };

    (
        find_column(sort_column.as_deref(), sortable, default_column),
        parse_order(&sort_order),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_sort_valid() {
        let (col, order) = parse_json_sort(r#"["delivery_date", "DESC"]"#);
        assert_eq!(col.as_deref(), Some("delivery_date"));
        assert_eq!(order, "DESC");
    }

    #[test]
    fn test_parse_json_sort_partial() {
        let (col, order) = parse_json_sort(r#"["name"]"#);
        assert_eq!(col.as_deref(), Some("name"));
        assert_eq!(order, DEFAULT_SORT_ORDER);
    }

    #[test]
    fn test_parse_json_sort_invalid_json() {
        let (col, order) = parse_json_sort("invalid json");
        assert_eq!(col, None);
        assert_eq!(order, DEFAULT_SORT_ORDER);
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("asc"), Order::Asc);
        assert_eq!(parse_order("DESC"), Order::Desc);
        assert_eq!(parse_order("random"), Order::Desc);
    }
}
