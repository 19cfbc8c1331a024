//! Keel: named models persisted through pooled connections.
//!
//! ```rust
//! use keel::{Model, Options, Pool, PoolConfig, Schema};
//! use keel_memory::{MemoryDriver, TableDef};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> keel::Result<()> {
//! let driver = MemoryDriver::new().table(
//!     TableDef::new("animals")
//!         .identity("id")
//!         .column("kind")
//!         .unique("name")
//!         .column("age"),
//! )?;
//! let pool = Pool::new(driver, PoolConfig::new(4));
//! let animals = Model::define(
//!     &pool,
//!     "animals",
//!     Schema::new()
//!         .identity("id")
//!         .field("kind")
//!         .field("name")
//!         .field_with_default("age", 0),
//! );
//! let bugs = animals
//!     .save(json!({ "kind": "rabbit", "name": "bugs bunny" }), Options::new())
//!     .await?;
//! assert_eq!(bugs.try_get::<i32>("age")?, 0);
//! let rabbits = animals.all(json!({ "kind": "rabbit" }), Options::new()).await?;
//! assert_eq!(rabbits.len(), 1);
//! # Ok(())
//! # }
//! ```
pub use keel_core::*;
