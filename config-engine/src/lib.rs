//! Versioned, schema-validated configuration engine for Confman
//!
//! This crate holds the rules that govern how a named JSON configuration
//! changes over time:
//! - Every successful write appends exactly one immutable version
//! - Version numbers start at 1 and are contiguous
//! - Rollback copies a historical payload forward as a new version and
//!   records where it came from
//! - A registered JSON Schema gates every create and update
//!
//! Storage is reached only through the [`ConfigStore`] trait. The in-memory
//! backend lives here; the SQLite backend lives in `database-layer`.
//!
//! # Example
//!
//! ```rust
//! use config_engine::{ConfigEngine, MemoryStore, Provenance};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), config_engine::ConfigError> {
//! let engine = ConfigEngine::new(Arc::new(MemoryStore::new()));
//!
//! engine.create("payment-config", json!({"max_limit": 1000})).await?;
//! engine.update("payment-config", json!({"max_limit": 2000})).await?;
//! let head = engine.rollback("payment-config", 1).await?;
//!
//! assert_eq!(head.version, 3);
//! assert_eq!(head.provenance, Provenance::RollbackOf { from: 2, to: 1 });
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod store;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use memory::*;
pub use model::*;
pub use store::*;
pub use validation::*;
