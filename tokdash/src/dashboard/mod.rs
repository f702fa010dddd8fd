//! Usage aggregation and derived metrics for the dashboard.
//!
//! A request flows through the submodules in order:
//!
//! 1. [`buckets`] resolves the query into a time window and picks hourly or daily trend buckets
//! 2. a [`source::UsageSource`] reads grouped sums for that window, plus daily activity for the
//!    trailing-year [`heatmap`]
//! 3. [`aggregate`] normalizes provider and model names with [`normalize`], merges rows that
//!    share a canonical name and derives brand totals
//! 4. [`derive`] computes the zero-guarded ratios and trend indicators
//! 5. [`assemble`] composes everything into a single
//!    [`DashboardData`](crate::api::models::dashboard::DashboardData)
//!
//! Nothing in here holds mutable state; a [`Dashboard`] is shared across requests behind an `Arc`.

pub mod aggregate;
pub mod assemble;
pub mod buckets;
pub mod derive;
pub mod heatmap;
pub mod normalize;
pub mod source;

pub use assemble::{DEFAULT_TOP_MODELS, Dashboard};
pub use buckets::{DashboardQuery, RangePreset};
pub use normalize::NameNormalizer;
pub use source::{LogRecord, MemorySource, UsageSource};
