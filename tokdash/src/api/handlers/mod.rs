//! HTTP request handlers for all API endpoints.
//!
//! - [`dashboard`]: `GET /api/dashboard`, the aggregated usage view

pub mod dashboard;
