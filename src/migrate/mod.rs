//! The migration engine.
//!
//! [`MigrationDriver`] wipes the graph, resets the uniqueness constraints of
//! every mapped label, then hands each mapping to a [`MappingExecutor`],
//! which decodes rows with [`ColumnRoles`] and resolves endpoint nodes
//! through an [`IdentityResolver`].

pub mod constraints;
pub mod decoder;
pub mod driver;
pub mod executor;
pub mod resolver;

pub use constraints::{mapped_labels, reset_constraints};
pub use decoder::{decode_bytes, ColumnRole, ColumnRoles, DecodedRow};
pub use driver::{MigrationDriver, MigrationReport};
pub use executor::{MappingExecutor, MappingStats};
pub use resolver::IdentityResolver;
