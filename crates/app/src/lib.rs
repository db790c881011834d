//! # lightsync-app
//!
//! Application layer — the device state synchronization engine and the
//! **port definitions** (traits) it drives.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceStore` — durable CRUD for device records
//!   - `MessageBus` — connect / subscribe / publish on named topics
//! - Define the **inbound bus port** (`BusEventSink`) through which the bus
//!   adapter hands over connection changes and delivered messages
//! - Keep the in-memory **device registry** that presentation layers read
//! - Run the **reconciliation engine** on a single FIFO worker, with
//!   self-echo suppression for locally initiated deletions and published
//!   commands
//! - Deliver **minimal change notifications** to observers
//!
//! ## Dependency rule
//! Depends on `lightsync-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod notifier;
pub mod pending;
pub mod ports;
pub mod published;
pub mod registry;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
