//! # hvac-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `hvac-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Seed the store from static configuration on first boot
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `hvac-app` (for port traits) and `hvac-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod device_repo;
pub mod error;
pub mod pool;
pub mod seed;
pub mod sensor_repo;
pub mod system_repo;
pub mod zone_repo;

mod codec;
