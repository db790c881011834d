//! # lightsync-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `DeviceStore` port defined in `lightsync-app::ports::store`
//! - Open the `SQLite` pool with WAL journaling for a single writer
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `lightsync-app` (for port traits) and `lightsync-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod device_store;
pub mod error;
pub mod pool;

pub use device_store::SqliteDeviceStore;
pub use pool::connect;
