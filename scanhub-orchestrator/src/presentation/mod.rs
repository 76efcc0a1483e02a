//! HTTP presentation layer

pub mod controllers;
pub mod errors;
pub mod models;
pub mod routes;

pub use controllers::OrchestratorState;
pub use errors::ApiError;
pub use routes::{ApiDoc, create_router};
