//! API request and response data models.
//!
//! These types define the public JSON contract and are annotated with `utoipa` for the generated
//! OpenAPI document. Field names are camelCase on the wire.
//!
//! - [`dashboard`]: query parameters and the dashboard response

pub mod dashboard;
