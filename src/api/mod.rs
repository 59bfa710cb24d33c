//! HTTP surface: sync trigger endpoints, health check, and static
//! serving of re-hosted cover images.

mod handlers;
mod server;

pub use handlers::{ApiError, ErrorResponse, HealthResponse};
pub use server::{router, run, AppContext};
