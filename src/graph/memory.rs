//! In-process graph store with the same constraint semantics as Neo4j.
//!
//! Backs `--dry-run` and the migration tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::cypher::constraint_name;
use super::{GraphStore, Identity, NodeRef, Properties};
use crate::error::{MigrationError, Result};

#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub label: String,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub struct MemoryRelationship {
    pub from: usize,
    pub to: usize,
    pub relation: String,
    pub properties: Properties,
}

/// In-memory graph
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<MemoryNode>,
    /// First node created for each (label, identity)
    index: HashMap<(String, Identity), usize>,
    relationships: Vec<MemoryRelationship>,
    /// Uniqueness constraints on `label.id`, by constraint name
    constraints: BTreeMap<String, String>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[MemoryRelationship] {
        &self.relationships
    }

    pub fn nodes_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a MemoryNode> + 'a {
        self.nodes.iter().filter(move |n| n.label == label)
    }

    pub fn has_constraint(&self, label: &str) -> bool {
        self.constraints.values().any(|l| l == label)
    }

    /// Register a uniqueness constraint on `label.id` under any name, the
    /// way a constraint created by another tool would exist.
    pub fn add_named_constraint(&mut self, name: &str, label: &str) {
        self.constraints.insert(name.to_string(), label.to_string());
    }

    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraints.keys().map(String::as_str)
    }

    fn node_ref(&self, idx: usize) -> NodeRef {
        let node = &self.nodes[idx];
        NodeRef {
            label: node.label.clone(),
            identity: node.identity.clone(),
            key: idx.to_string(),
        }
    }

    fn resolve_key(&self, node: &NodeRef) -> Result<usize> {
        node.key
            .parse::<usize>()
            .ok()
            .filter(|idx| *idx < self.nodes.len())
            .ok_or_else(|| MigrationError::Query(format!("Unknown node key {}", node.key)))
    }
}

impl GraphStore for MemoryGraph {
    async fn wipe(&mut self) -> Result<()> {
        self.nodes.clear();
        self.index.clear();
        self.relationships.clear();
        Ok(())
    }

    async fn drop_unique_constraint(&mut self, label: &str) -> Result<()> {
        let before = self.constraints.len();
        self.constraints.retain(|_, l| l != label);
        if self.constraints.len() < before {
            Ok(())
        } else {
            Err(MigrationError::ConstraintDrop {
                label: label.to_string(),
                message: "No such constraint".to_string(),
            })
        }
    }

    async fn create_unique_constraint(&mut self, label: &str) -> Result<()> {
        if self.has_constraint(label) {
            return Err(MigrationError::ConstraintCreation {
                label: label.to_string(),
                message: "An equivalent constraint already exists".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for node in self.nodes_with_label(label) {
            if !seen.insert(&node.identity) {
                return Err(MigrationError::ConstraintCreation {
                    label: label.to_string(),
                    message: format!("Duplicate nodes with id {}", node.identity),
                });
            }
        }

        self.constraints.insert(constraint_name(label), label.to_string());
        Ok(())
    }

    async fn find_node(&self, label: &str, identity: &Identity) -> Result<Option<NodeRef>> {
        Ok(self
            .index
            .get(&(label.to_string(), identity.clone()))
            .map(|idx| self.node_ref(*idx)))
    }

    async fn create_node(&mut self, label: &str, identity: &Identity) -> Result<NodeRef> {
        let key = (label.to_string(), identity.clone());
        if self.has_constraint(label) && self.index.contains_key(&key) {
            return Err(MigrationError::Query(format!(
                "Node({}) already exists with label `{}` and property `id` = {}",
                self.index[&key], label, identity
            )));
        }

        let idx = self.nodes.len();
        self.nodes.push(MemoryNode {
            label: label.to_string(),
            identity: identity.clone(),
        });
        self.index.entry(key).or_insert(idx);
        Ok(self.node_ref(idx))
    }

    async fn create_relationship(
        &mut self,
        from: &NodeRef,
        to: &NodeRef,
        relation: &str,
        properties: &Properties,
    ) -> Result<()> {
        let from = self.resolve_key(from)?;
        let to = self.resolve_key(to)?;
        self.relationships.push(MemoryRelationship {
            from,
            to,
            relation: relation.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }

    async fn count_nodes(&self) -> Result<u64> {
        Ok(self.nodes.len() as u64)
    }

    async fn count_relationships(&self) -> Result<u64> {
        Ok(self.relationships.len() as u64)
    }
}
