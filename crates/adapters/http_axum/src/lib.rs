//! # lightsync-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for reading the device list and issuing user
//!   actions (toggle, set, rename, register, delete, reload)
//! - Stream **change notifications** to clients over Server-Sent Events
//! - Map HTTP requests into engine calls (driving adapter)
//! - Map engine results and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `lightsync-app` (for the engine handle) and `lightsync-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
