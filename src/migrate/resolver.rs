//! Find-or-create of endpoint nodes.

use crate::error::Result;
use crate::graph::{GraphStore, Identity, NodeRef};

/// Resolves (label, identity) pairs to nodes, creating missing ones.
///
/// Lookup and creation are two separate statements, so callers must not
/// resolve the same pair concurrently.
pub struct IdentityResolver<'a, G: GraphStore> {
    store: &'a mut G,
    created: u64,
}

impl<'a, G: GraphStore> IdentityResolver<'a, G> {
    pub fn new(store: &'a mut G) -> Self {
        Self { store, created: 0 }
    }

    pub async fn find_or_create(&mut self, label: &str, identity: &Identity) -> Result<NodeRef> {
        if let Some(node) = self.store.find_node(label, identity).await? {
            return Ok(node);
        }

        let node = self.store.create_node(label, identity).await?;
        self.created += 1;
        log::debug!("Created {}({})", label, identity);
        Ok(node)
    }

    /// Nodes created through this resolver
    pub fn created(&self) -> u64 {
        self.created
    }

    /// The underlying store, for writes that are not node resolution
    pub fn store(&mut self) -> &mut G {
        &mut *self.store
    }
}
