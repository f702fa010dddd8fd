//! Query implementations for database access.
//!
//! - [`usage`]: [`PgUsageSource`](usage::PgUsageSource), the aggregate reads behind the dashboard

pub mod usage;

pub use usage::PgUsageSource;
