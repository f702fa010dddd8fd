//! Database record models for the aggregate queries.
//!
//! Rows derive `sqlx::FromRow` and convert into the dashboard's sum types with `TryFrom`, which
//! is where `NULL` aggregates are coerced to zero.

pub mod usage;
