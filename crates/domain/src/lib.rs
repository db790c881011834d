//! # lightsync-domain
//!
//! Pure domain model for the lightsync device synchronization engine.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions
//! - Define the **device record** (the only persisted/cached entity)
//! - Define the **command protocol**: topic parsing, payload vocabulary,
//!   outbound command encoding
//! - Define **local intents** (toggle light, toggle mode, rename, …)
//! - Compute **minimal list diffs** between two device snapshots
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;

pub mod change;
pub mod command;
pub mod device;
pub mod intent;
