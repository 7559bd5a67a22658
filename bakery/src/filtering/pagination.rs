use axum::http::header::{HeaderMap, HeaderValue};

pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Build the `Content-Range` and `X-Total-Count` headers for a list response.
///
/// `Content-Range` reads `<resource> <first>-<last>/<total>` with both ends being
/// indexes of rows actually on the page. A page with no rows reads
/// `<resource> */<total>`.
#[must_use]
pub fn calculate_content_range(offset: u64, limit: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let span = if offset >= total_count || limit == 0 {
        "*".to_string()
    } else {
        let last = offset.saturating_add(limit - 1).min(total_count - 1);
        format!("{offset}-{last}")
    };

    let safe_name = sanitize_resource_name(resource_name);
    let content_range = format!("{safe_name} {span}/{total_count}");

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&content_range).unwrap_or_else(|_| {
        HeaderValue::from_str(&format!("items {span}/{total_count}"))
            .unwrap_or(HeaderValue::from_static("items */0"))
    });
    headers.insert("Content-Range", value);
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(total_count));

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_normal() {
        let headers = calculate_content_range(0, 10, 100, "orders");
        assert_eq!(headers.get("Content-Range").unwrap(), "orders 0-9/100");
        assert_eq!(headers.get(TOTAL_COUNT_HEADER).unwrap(), "100");
    }

    #[test]
    fn test_content_range_last_page_ends_at_last_row() {
        let headers = calculate_content_range(20, 10, 25, "stores");
        assert_eq!(headers.get("Content-Range").unwrap(), "stores 20-24/25");

        let headers = calculate_content_range(0, 10, 3, "products");
        assert_eq!(headers.get("Content-Range").unwrap(), "products 0-2/3");
    }

    #[test]
    fn test_content_range_empty_page() {
        let headers = calculate_content_range(0, 10, 0, "vehicles");
        assert_eq!(headers.get("Content-Range").unwrap(), "vehicles */0");
        assert_eq!(headers.get(TOTAL_COUNT_HEADER).unwrap(), "0");

        let headers = calculate_content_range(30, 10, 25, "stores");
        assert_eq!(headers.get("Content-Range").unwrap(), "stores */25");
    }

    #[test]
    fn test_content_range_strips_control_characters() {
        let headers = calculate_content_range(0, 10, 100, "users\r\nInjected: evil");
        let value = headers.get("Content-Range").unwrap().to_str().unwrap();
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
    }

    #[test]
    fn test_content_range_large_numbers() {
        let headers = calculate_content_range(u64::MAX - 100, 1_000, u64::MAX, "products");
        assert!(headers.get("Content-Range").is_some());
    }
}
