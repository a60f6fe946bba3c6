//! # causerie-store
//!
//! Durable state for the conversation core, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed CRUD helpers per domain model, plus the
//! live layer on top of it: [`MessageStore`] (append-only ordered message log
//! with live subscriptions) and [`DeviceRegistry`] (per-user set of delivery
//! targets). Delivery-record persistence for the fan-out layer lives here too,
//! guarded by a `(notification_key, target)` primary key so record creation is
//! an atomic create-if-absent.

pub mod database;
pub mod deliveries;
pub mod live;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod registry;

mod error;

pub use database::{Database, SharedDatabase};
pub use error::StoreError;
pub use live::{MessageStore, Subscription};
pub use models::*;
pub use registry::DeviceRegistry;
