//! SQLite storage backend for Confman
//!
//! Implements [`config_engine::ConfigStore`] on four tables:
//!
//! | Table | Key | Content |
//! |---|---|---|
//! | `configurations` | `name` | head version, timestamps, rollback provenance |
//! | `versions` | `(name, version)` | creation time, rollback flag |
//! | `version_data` | `(name, version)` | JSON payload |
//! | `schemas` | `name` | JSON Schema document |
//!
//! Every write runs in one transaction. Head updates are conditional on the
//! head the caller read, so a concurrent writer surfaces as
//! [`config_engine::StoreError::Conflict`] instead of a lost update.

pub mod configuration_repository;
pub mod connection;
pub mod error;
pub mod migration;
pub mod transaction;

pub use configuration_repository::*;
pub use connection::*;
pub use error::*;
pub use migration::*;
pub use transaction::*;
