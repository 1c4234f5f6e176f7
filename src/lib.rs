pub mod config;
pub mod error;
pub mod graph;
pub mod migrate;
pub mod naming;
pub mod source;

pub use config::Config;
pub use error::{MigrationError, Result};
pub use graph::{GraphStore, Identity, MemoryGraph, Neo4jStore};
pub use migrate::{MigrationDriver, MigrationReport};
pub use source::SourceDb;
