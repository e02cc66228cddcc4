//! REST API layer (spec.md §6.1), grounded on the teacher's `api/mod.rs`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use response::{PaginatedResponse, SuccessResponse};
pub use routes::create_router;
