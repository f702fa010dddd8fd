//! Database layer for the PostgreSQL usage source.
//!
//! This module implements read-only aggregate access to the `logs` table using SQLx.
//!
//! ```text
//! ┌─────────────┐
//! │  Dashboard  │  (dashboard::assemble)
//! └──────┬──────┘
//!        │  UsageSource
//!        ↓
//! ┌─────────────┐
//! │  Handlers   │  (db::handlers - aggregate queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - rows and NULL coercion)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Aggregate queries issued concurrently per dashboard read
//! - [`models`]: Row structures and their conversion into sum types
//! - [`errors`]: Database-specific error types
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! tokdash::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
