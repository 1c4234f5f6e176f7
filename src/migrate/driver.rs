//! Whole-run orchestration: wipe, constraint reset, then every mapping.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use super::constraints::{mapped_labels, reset_constraints};
use super::executor::{MappingExecutor, MappingStats};
use crate::config::MappingConfig;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::source::SourceDb;

/// Outcome of a full run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub labels: Vec<String>,
    pub mappings: Vec<MappingStats>,
    /// Graph totals after the run
    pub nodes: u64,
    pub relationships: u64,
}

/// Migrates a list of mappings into a graph store
///
/// Every run starts by deleting the whole graph, so rerunning over
/// unchanged source data rebuilds the same graph. A failure leaves the
/// graph partially rebuilt; recovery is another full run.
pub struct MigrationDriver<'a, G: GraphStore> {
    source: &'a SourceDb,
    graph: &'a mut G,
}

impl<'a, G: GraphStore> MigrationDriver<'a, G> {
    pub fn new(source: &'a SourceDb, graph: &'a mut G) -> Self {
        Self { source, graph }
    }

    pub async fn run(&mut self, mappings: &[MappingConfig]) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        // Reject bad names before anything destructive happens
        for mapping in mappings {
            mapping.validate()?;
        }
        let labels = mapped_labels(mappings)?;

        log::info!("Wiping target graph");
        self.graph.wipe().await?;

        log::info!("Resetting uniqueness constraints for {} label(s)", labels.len());
        reset_constraints(&mut *self.graph, &labels).await?;

        let mut stats = Vec::with_capacity(mappings.len());
        for (idx, mapping) in mappings.iter().enumerate() {
            log::info!(
                "[{}/{}] Mapping {} -[{}]-> {} via {}",
                idx + 1,
                mappings.len(),
                mapping.from_entity,
                mapping.relation_name,
                mapping.to_entity,
                mapping.intermediate_entity
            );
            let mapping_stats = MappingExecutor::new(self.source, &mut *self.graph)
                .execute(mapping)
                .await?;
            stats.push(mapping_stats);
        }

        let report = MigrationReport {
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            labels: labels.into_iter().collect(),
            mappings: stats,
            nodes: self.graph.count_nodes().await?,
            relationships: self.graph.count_relationships().await?,
        };
        report.log_summary();
        Ok(report)
    }
}

impl MigrationReport {
    pub fn log_summary(&self) {
        log::info!("=== Migration Complete ===");
        for m in &self.mappings {
            log::info!(
                "{}: {} rows -> {} {} relationships, {} new nodes",
                m.table,
                m.rows_read,
                m.relationships_created,
                m.relation,
                m.nodes_created
            );
        }
        log::info!("Labels: {}", self.labels.join(", "));
        log::info!("Nodes: {}", self.nodes);
        log::info!("Relationships: {}", self.relationships);
        log::info!("Time: {}ms", self.elapsed_ms);
    }
}
