//! HTTP API for planning and outcome reporting
//!
//! - `POST /api/plans` generates (and stores) a day plan
//! - `GET /api/plans/{day}` lists stored assignments
//! - `GET /api/plans/{day}/verify` audits them
//! - `POST /api/assignments/{id}/outcome` records a real-world result
//! - `GET /metrics` exposes Prometheus metrics

pub mod api;
pub mod server;

pub use api::{create_router, ApiResponse, ErrorResponse};
pub use server::{ApiServer, AppState, ServerError, ServerInfo};
