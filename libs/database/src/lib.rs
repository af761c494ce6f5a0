//! Database connectors and utilities
//!
//! Wraps SeaORM connection setup for PostgreSQL with the pool defaults, retry
//! policy and health checks used by every service in the workspace.
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL support with SeaORM
//! - `config` - `core_config::FromEnv` support for [`postgres::PostgresConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use migration::Migrator;
//!
//! let db = postgres::connect_with_retry(PostgresConfig::new(url), None).await?;
//! postgres::run_migrations::<Migrator>(&db, "shop-sync").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
