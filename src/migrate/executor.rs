//! Execution of a single mapping: intermediate-table rows to relationships.

use serde::Serialize;

use super::decoder::ColumnRoles;
use super::resolver::IdentityResolver;
use crate::config::MappingConfig;
use crate::error::{MigrationError, Result};
use crate::graph::GraphStore;
use crate::naming;
use crate::source::SourceDb;

/// Outcome of one mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingStats {
    pub table: String,
    pub relation: String,
    /// `count(*)` taken before the scan
    pub source_rows: u64,
    pub rows_read: u64,
    pub relationships_created: u64,
    pub nodes_created: u64,
}

/// Runs mappings against an injected source and graph store
pub struct MappingExecutor<'a, G: GraphStore> {
    source: &'a SourceDb,
    graph: &'a mut G,
}

impl<'a, G: GraphStore> MappingExecutor<'a, G> {
    pub fn new(source: &'a SourceDb, graph: &'a mut G) -> Self {
        Self { source, graph }
    }

    /// Turn every row of the mapping's intermediate table into a relationship.
    ///
    /// Rows are processed in fetch order. A row without a from or to
    /// identity aborts the mapping.
    pub async fn execute(&mut self, mapping: &MappingConfig) -> Result<MappingStats> {
        let from_label = naming::titleize(&mapping.from_entity)?;
        let to_label = naming::titleize(&mapping.to_entity)?;
        let table = naming::pluralize(&mapping.intermediate_entity);
        let roles = ColumnRoles::new(mapping);

        let source_rows = self.source.count_rows(&table).await?;
        log::info!(
            "{} count: {} ({} -[{}]-> {})",
            table,
            source_rows,
            from_label,
            mapping.relation_name,
            to_label
        );

        let mut stats = MappingStats {
            table: table.clone(),
            relation: mapping.relation_name.clone(),
            source_rows,
            ..Default::default()
        };

        let mut rows = self.source.stream_rows(&table);
        let mut resolver = IdentityResolver::new(&mut *self.graph);

        while let Some(row) = rows.next().await {
            let row = row?;
            stats.rows_read += 1;

            let decoded = roles.decode(&row)?;
            let from_identity = decoded.from.ok_or_else(|| MigrationError::MalformedRow {
                table: table.clone(),
                row: stats.rows_read,
                reason: format!("{} is missing", roles.from_id_column),
            })?;
            let to_identity = decoded.to.ok_or_else(|| MigrationError::MalformedRow {
                table: table.clone(),
                row: stats.rows_read,
                reason: format!(
                    "both {} and {} are missing",
                    roles.to_id_column, roles.to_code_column
                ),
            })?;

            let from = resolver.find_or_create(&from_label, &from_identity).await?;
            let to = resolver.find_or_create(&to_label, &to_identity).await?;

            resolver
                .store()
                .create_relationship(&from, &to, &mapping.relation_name, &decoded.properties)
                .await?;
            stats.relationships_created += 1;

            if stats.rows_read % 1000 == 0 {
                log::info!("{}: {}/{} rows", table, stats.rows_read, source_rows);
            }
        }

        stats.nodes_created = resolver.created();
        log::info!(
            "✓ {} ({} relationships, {} new nodes)",
            table,
            stats.relationships_created,
            stats.nodes_created
        );
        Ok(stats)
    }
}
