//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! The dashboard is served at `GET /api/dashboard`. API documentation is available at
//! `/api/docs` when the server is running, and the raw document at `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
