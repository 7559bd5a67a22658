// Resource traits and the generic HTTP handlers built on them

pub mod handlers;
pub mod traits;

pub use handlers::crud_router;
pub use traits::{CRUDResource, MergeIntoActiveModel};
