//! Uniqueness constraints on node identities.

use std::collections::BTreeSet;

use crate::config::MappingConfig;
use crate::error::{MigrationError, Result};
use crate::graph::GraphStore;
use crate::naming;

/// Every distinct label the mappings resolve nodes for.
pub fn mapped_labels(mappings: &[MappingConfig]) -> Result<BTreeSet<String>> {
    let mut labels = BTreeSet::new();
    for mapping in mappings {
        labels.insert(naming::titleize(&mapping.from_entity)?);
        labels.insert(naming::titleize(&mapping.to_entity)?);
    }
    Ok(labels)
}

/// Drop and recreate the uniqueness constraints of every label.
///
/// A drop the store refuses (usually because there is nothing to drop) is
/// logged and ignored. An unreachable store or a failed creation aborts.
pub async fn reset_constraints<G: GraphStore>(store: &mut G, labels: &BTreeSet<String>) -> Result<()> {
    for label in labels {
        match store.drop_unique_constraint(label).await {
            Ok(()) => log::debug!("Dropped uniqueness constraint on {}", label),
            Err(e @ MigrationError::ConstraintDrop { .. }) => {
                log::warn!("{}", e);
            }
            Err(e) => return Err(e),
        }

        store.create_unique_constraint(label).await?;
        log::info!("Uniqueness constraint on {}.id in place", label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Identity, MemoryGraph, NodeRef, Properties};

    fn mapping(from: &str, to: &str) -> MappingConfig {
        MappingConfig {
            from_entity: from.to_string(),
            to_entity: to.to_string(),
            intermediate_entity: format!("{}_{}", from, to),
            relation_name: "RELATES".to_string(),
        }
    }

    #[test]
    fn test_mapped_labels_deduplicated() {
        let labels = mapped_labels(&[
            mapping("person", "language"),
            mapping("person", "media_resource"),
            mapping("channel", "media_resource"),
        ])
        .unwrap();
        let labels: Vec<_> = labels.into_iter().collect();
        assert_eq!(labels, vec!["Channel", "Language", "MediaResource", "Person"]);
    }

    #[test]
    fn test_mapped_labels_invalid_entity() {
        let result = mapped_labels(&[mapping("person_", "language")]);
        assert!(matches!(result, Err(MigrationError::InvalidEntityName(_))));
    }

    #[tokio::test]
    async fn test_reset_on_fresh_store() {
        let mut graph = MemoryGraph::new();
        let labels = mapped_labels(&[mapping("person", "language")]).unwrap();
        reset_constraints(&mut graph, &labels).await.unwrap();
        assert!(graph.has_constraint("Person"));
        assert!(graph.has_constraint("Language"));
    }

    #[tokio::test]
    async fn test_reset_twice() {
        let mut graph = MemoryGraph::new();
        let labels = mapped_labels(&[mapping("person", "language")]).unwrap();
        reset_constraints(&mut graph, &labels).await.unwrap();
        reset_constraints(&mut graph, &labels).await.unwrap();
        assert!(graph.has_constraint("Person"));
    }

    #[tokio::test]
    async fn test_reset_replaces_foreign_constraint() {
        let mut graph = MemoryGraph::new();
        graph.add_named_constraint("constraint_1a2b", "Person");

        let labels = mapped_labels(&[mapping("person", "language")]).unwrap();
        reset_constraints(&mut graph, &labels).await.unwrap();

        let names: Vec<_> = graph.constraint_names().collect();
        assert_eq!(names, vec!["Language_id_unique", "Person_id_unique"]);
    }

    #[tokio::test]
    async fn test_duplicates_abort() {
        let mut graph = MemoryGraph::new();
        graph.create_node("Person", &Identity::Numeric(1)).await.unwrap();
        graph.create_node("Person", &Identity::Numeric(1)).await.unwrap();

        let labels = mapped_labels(&[mapping("person", "language")]).unwrap();
        let result = reset_constraints(&mut graph, &labels).await;
        assert!(matches!(result, Err(MigrationError::ConstraintCreation { .. })));
    }

    /// Store whose every call fails as unreachable.
    struct Unreachable;

    impl GraphStore for Unreachable {
        async fn wipe(&mut self) -> Result<()> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn drop_unique_constraint(&mut self, _label: &str) -> Result<()> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn create_unique_constraint(&mut self, _label: &str) -> Result<()> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn find_node(&self, _label: &str, _identity: &Identity) -> Result<Option<NodeRef>> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn create_node(&mut self, _label: &str, _identity: &Identity) -> Result<NodeRef> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn create_relationship(
            &mut self,
            _from: &NodeRef,
            _to: &NodeRef,
            _relation: &str,
            _properties: &Properties,
        ) -> Result<()> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn count_nodes(&self) -> Result<u64> {
            Err(MigrationError::Connection("down".to_string()))
        }
        async fn count_relationships(&self) -> Result<u64> {
            Err(MigrationError::Connection("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_on_drop_is_fatal() {
        let labels = mapped_labels(&[mapping("person", "language")]).unwrap();
        let result = reset_constraints(&mut Unreachable, &labels).await;
        assert!(matches!(result, Err(MigrationError::Connection(_))));
    }
}
