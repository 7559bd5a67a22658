//! # Filtering, Sorting & Pagination
//!
//! Turns the list-endpoint query string into a Sea-ORM [`Condition`](sea_orm::Condition),
//! an order-by column and an offset/limit pair. The dashboard speaks the React
//! Admin dialect (`filter`, `range`, `sort` as JSON), plain REST clients can use
//! `page`/`per_page` and `sort_by`/`order`.
//!
//! ```text
//! GET /api/orders?filter={"status":"pending","delivery_date_gte":"2024-05-01"}&range=[0,24]
//! GET /api/products?filter={"q":"كرواسون"}&sort=["price_eur","DESC"]
//! GET /api/vehicles?page=2&per_page=20&sort_by=plate_number
//! ```
//!
//! Only the columns a resource declares as filterable or sortable are reachable,
//! and every value is bound as a parameter.

pub mod conditions;
pub mod pagination;
pub mod query_parser;
pub mod search;
pub mod sort;

pub use conditions::{apply_filters, parse_pagination, parse_range};
pub use pagination::calculate_content_range;
pub use query_parser::FilterOptions;
pub use search::build_fulltext_condition;
pub use sort::parse_sorting;
