//! HTTP surface: beacon collection, dashboard reads, and management routes

pub mod collect;
pub mod dashboard;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
