use sea_orm::{
    DatabaseBackend,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};

use crate::core::CRUDResource;

// Basic safety limits
const MAX_SEARCH_QUERY_LENGTH: usize = 10_000;

/// Escape LIKE wildcards so user input only ever matches literally.
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn like_pattern(value: &str) -> String {
    let truncated: String = value.chars().take(MAX_SEARCH_QUERY_LENGTH).collect();
    format!("%{}%", escape_like_wildcards(truncated.trim()).to_uppercase())
}

/// Case-insensitive substring search over the concatenation of the resource's
/// fulltext columns. Returns `None` when the resource has no such columns.
#[must_use]
pub fn build_fulltext_condition<T: CRUDResource>(
    query: &str,
    backend: DatabaseBackend,
) -> Option<SimpleExpr> {
    let columns = T::fulltext_searchable_columns();
    if columns.is_empty() || query.trim().is_empty() {
        return None;
    }

    // Column names come from the resource definition, never from the request
    let (concat_sql, escape) = match backend {
        DatabaseBackend::MySql => (
            format!(
                "CONCAT_WS(' ', {})",
                columns
                    .iter()
                    .map(|(name, _)| format!("`{name}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            r"'\\'",
        ),
        DatabaseBackend::Postgres | DatabaseBackend::Sqlite => (
            columns
                .iter()
                .map(|(name, _)| format!("COALESCE(CAST(\"{name}\" AS TEXT), '')"))
                .collect::<Vec<_>>()
                .join(" || ' ' || "),
            r"'\'",
        ),
    };

    Some(Expr::cust_with_values(
        format!("UPPER({concat_sql}) LIKE ? ESCAPE {escape}"),
        [like_pattern(query)],
    ))
}

/// Case-insensitive `UPPER(column) LIKE '%VALUE%'` with escaped wildcards
#[must_use]
pub fn build_like_condition(key: &str, trimmed_value: &str) -> SimpleExpr {
    Expr::expr(Func::upper(Expr::col(Alias::new(key))))
        .like(LikeExpr::new(like_pattern(trimmed_value)).escape('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_escaping() {
        assert_eq!(escape_like_wildcards("test"), "test");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("test_value"), "test\\_value");
        assert_eq!(escape_like_wildcards("\\"), "\\\\");
    }

    #[test]
    fn test_like_pattern_is_upper_cased_and_wrapped() {
        assert_eq!(like_pattern(" croissant "), "%CROISSANT%");
        assert_eq!(like_pattern("كعك"), "%كعك%");
    }

    #[test]
    fn test_like_pattern_truncates_long_input() {
        let long = "a".repeat(MAX_SEARCH_QUERY_LENGTH + 50);
        assert_eq!(like_pattern(&long).len(), MAX_SEARCH_QUERY_LENGTH + 2);
    }

    #[test]
    fn test_like_condition_uses_column_node_and_bound_value() {
        let sql = format!("{:?}", build_like_condition("name", "'; DROP TABLE stores; --"));
        assert!(sql.contains("Column("), "column should be an AST node: {sql}");
        assert!(sql.contains("DROP TABLE"), "value is carried as a bound pattern: {sql}");
    }
}
