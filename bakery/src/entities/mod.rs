//! Database entities, their API representations and per-resource business rules.

pub mod order;
pub mod order_item;
pub mod product;
pub mod scheduling_draft;
pub mod store;
pub mod user;
pub mod vehicle;

pub use order::{Order, OrderOperations};
pub use product::{Product, ProductOperations};
pub use scheduling_draft::{DraftOperations, SchedulingDraft};
pub use store::{Store, StoreOperations};
pub use user::{User, UserOperations};
pub use vehicle::{Vehicle, VehicleOperations};
