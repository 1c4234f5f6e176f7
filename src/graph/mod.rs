//! Graph store: node identities, property values and the store trait the
//! migration writes through.
//!
//! Two stores implement [`GraphStore`]: [`Neo4jStore`] talks Cypher to a
//! Neo4j server, [`MemoryGraph`] keeps everything in process.

pub mod cypher;
pub mod memory;
pub mod neo4j;

pub use memory::MemoryGraph;
pub use neo4j::Neo4jStore;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Name of the single identity property every migrated node carries.
pub const IDENTITY_PROPERTY: &str = "id";

/// Value a node is looked up and deduplicated by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Identity {
    /// `<entity>_id` column
    Numeric(i64),
    /// `<entity>_code` column
    Code(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Numeric(id) => write!(f, "{}", id),
            Identity::Code(code) => write!(f, "'{}'", code),
        }
    }
}

/// Scalar stored as a relationship property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    #[serde(serialize_with = "serialize_float")]
    Float(f64),
    Text(String),
}

/// JSON has no infinities or NaN; send those as their text form instead of null.
fn serialize_float<S: serde::Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.collect_str(value)
    }
}

/// Relationship property bag, ordered by column name.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Handle to a node that exists in a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub label: String,
    pub identity: Identity,
    /// Store-assigned handle used to address the node in later statements.
    pub key: String,
}

/// Operations the migration needs from a graph database.
///
/// Calls are issued strictly one after another; implementations do not
/// need to be safe against concurrent `find_node`/`create_node` pairs.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Delete every node and relationship.
    async fn wipe(&mut self) -> Result<()>;

    /// Drop every uniqueness constraint on `label.id`, whatever its name.
    ///
    /// Finding none is reported as a drop failure. Errors reported by the store come back as
    /// [`MigrationError::ConstraintDrop`](crate::MigrationError::ConstraintDrop);
    /// an unreachable store as `Connection`.
    async fn drop_unique_constraint(&mut self, label: &str) -> Result<()>;

    /// Create the uniqueness constraint on `label.id`.
    async fn create_unique_constraint(&mut self, label: &str) -> Result<()>;

    async fn find_node(&self, label: &str, identity: &Identity) -> Result<Option<NodeRef>>;

    async fn create_node(&mut self, label: &str, identity: &Identity) -> Result<NodeRef>;

    async fn create_relationship(
        &mut self,
        from: &NodeRef,
        to: &NodeRef,
        relation: &str,
        properties: &Properties,
    ) -> Result<()>;

    async fn count_nodes(&self) -> Result<u64>;

    async fn count_relationships(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_untagged() {
        assert_eq!(serde_json::to_value(Identity::Numeric(7)).unwrap(), serde_json::json!(7));
        assert_eq!(
            serde_json::to_value(Identity::Code("en".to_string())).unwrap(),
            serde_json::json!("en")
        );
    }

    #[test]
    fn test_properties_serialize_as_map() {
        let mut props = Properties::new();
        props.insert("proficiency".to_string(), PropertyValue::Text("native".to_string()));
        props.insert("years".to_string(), PropertyValue::Integer(3));
        props.insert("score".to_string(), PropertyValue::Float(0.5));
        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            serde_json::json!({"proficiency": "native", "score": 0.5, "years": 3})
        );
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::Numeric(42).to_string(), "42");
        assert_eq!(Identity::Code("en".to_string()).to_string(), "'en'");
    }
}
