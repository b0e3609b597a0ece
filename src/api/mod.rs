//! HTTP API

pub mod handlers;
pub mod routes;
pub mod schemas;

pub use routes::create_router;
