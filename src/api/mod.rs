//! API module - route table, handlers, and identity extraction

pub mod handlers;
pub mod identity;
pub mod routes;

pub use identity::{MaybeIdentity, UserIdentity};
pub use routes::create_router;
