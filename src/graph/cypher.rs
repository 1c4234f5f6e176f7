//! Cypher statement shapes issued by the migration.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Identity, Properties, IDENTITY_PROPERTY};

/// A Cypher statement with its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub statement: String,
    pub parameters: Map<String, Value>,
}

impl Statement {
    fn new(statement: String) -> Self {
        Self {
            statement,
            parameters: Map::new(),
        }
    }

    fn param(mut self, name: &str, value: impl Serialize) -> Self {
        // Identity and PropertyValue serialize infallibly; Null is unreachable
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// Backtick-quote a label, relationship type or constraint name.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Name of the uniqueness constraint guarding `label.id`.
pub fn constraint_name(label: &str) -> String {
    format!("{}_{}_unique", label, IDENTITY_PROPERTY)
}

pub fn ping() -> Statement {
    Statement::new("RETURN 1".to_string())
}

pub fn wipe() -> Statement {
    Statement::new("MATCH (n) DETACH DELETE n".to_string())
}

/// Names of every uniqueness constraint on `label.id`, whoever created them.
pub fn unique_constraints_on(label: &str) -> Statement {
    Statement::new(format!(
        "SHOW CONSTRAINTS YIELD name, type, labelsOrTypes, properties \
         WHERE type IN ['UNIQUENESS', 'NODE_PROPERTY_UNIQUENESS'] \
         AND labelsOrTypes = [$label] AND properties = ['{}'] \
         RETURN name",
        IDENTITY_PROPERTY
    ))
    .param("label", label)
}

pub fn drop_constraint(name: &str) -> Statement {
    Statement::new(format!("DROP CONSTRAINT {}", quote(name)))
}

pub fn create_unique_constraint(label: &str) -> Statement {
    Statement::new(format!(
        "CREATE CONSTRAINT {} FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        quote(&constraint_name(label)),
        quote(label),
        IDENTITY_PROPERTY
    ))
}

pub fn match_node(label: &str, identity: &Identity) -> Statement {
    Statement::new(format!(
        "MATCH (n:{}) WHERE n.{} = $id RETURN elementId(n) LIMIT 1",
        quote(label),
        IDENTITY_PROPERTY
    ))
    .param("id", identity)
}

pub fn create_node(label: &str, identity: &Identity) -> Statement {
    Statement::new(format!(
        "CREATE (n:{} {{{}: $id}}) RETURN elementId(n)",
        quote(label),
        IDENTITY_PROPERTY
    ))
    .param("id", identity)
}

pub fn create_relationship(
    from_key: &str,
    to_key: &str,
    relation: &str,
    properties: &Properties,
) -> Statement {
    Statement::new(format!(
        "MATCH (a) WHERE elementId(a) = $from \
         MATCH (b) WHERE elementId(b) = $to \
         CREATE (a)-[r:{}]->(b) SET r = $props",
        quote(relation)
    ))
    .param("from", from_key)
    .param("to", to_key)
    .param("props", properties)
}

pub fn count_nodes() -> Statement {
    Statement::new("MATCH (n) RETURN count(n)".to_string())
}

pub fn count_relationships() -> Statement {
    Statement::new("MATCH ()-[r]->() RETURN count(r)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;
    use serde_json::json;

    #[test]
    fn test_quote() {
        assert_eq!(quote("Person"), "`Person`");
        assert_eq!(quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_constraint_statements() {
        assert_eq!(
            drop_constraint("constraint_1a2b").statement,
            "DROP CONSTRAINT `constraint_1a2b`"
        );
        assert_eq!(
            create_unique_constraint("MediaResource").statement,
            "CREATE CONSTRAINT `MediaResource_id_unique` FOR (n:`MediaResource`) REQUIRE n.id IS UNIQUE"
        );
    }

    #[test]
    fn test_constraint_lookup_binds_label() {
        let stmt = unique_constraints_on("Person");
        assert!(stmt.statement.starts_with("SHOW CONSTRAINTS"));
        assert!(stmt.statement.contains("labelsOrTypes = [$label] AND properties = ['id']"));
        assert_eq!(stmt.parameters.get("label"), Some(&json!("Person")));
    }

    #[test]
    fn test_non_finite_property_sent_as_text() {
        let mut props = Properties::new();
        props.insert("score".to_string(), PropertyValue::Float(f64::INFINITY));
        props.insert("weight".to_string(), PropertyValue::Float(f64::NAN));
        let stmt = create_relationship("4:abc:1", "4:abc:2", "RATES", &props);
        assert_eq!(
            stmt.parameters.get("props"),
            Some(&json!({"score": "inf", "weight": "NaN"}))
        );
    }

    #[test]
    fn test_match_node_binds_identity() {
        let stmt = match_node("Person", &Identity::Numeric(5));
        assert_eq!(
            stmt.statement,
            "MATCH (n:`Person`) WHERE n.id = $id RETURN elementId(n) LIMIT 1"
        );
        assert_eq!(stmt.parameters.get("id"), Some(&json!(5)));
    }

    #[test]
    fn test_create_node_binds_code() {
        let stmt = create_node("Language", &Identity::Code("en".to_string()));
        assert_eq!(stmt.statement, "CREATE (n:`Language` {id: $id}) RETURN elementId(n)");
        assert_eq!(stmt.parameters.get("id"), Some(&json!("en")));
    }

    #[test]
    fn test_create_relationship() {
        let mut props = Properties::new();
        props.insert("proficiency".to_string(), PropertyValue::Text("native".to_string()));
        let stmt = create_relationship("4:abc:1", "4:abc:2", "SPEAKS", &props);
        assert!(stmt.statement.contains("CREATE (a)-[r:`SPEAKS`]->(b) SET r = $props"));
        assert_eq!(stmt.parameters.get("from"), Some(&json!("4:abc:1")));
        assert_eq!(stmt.parameters.get("to"), Some(&json!("4:abc:2")));
        assert_eq!(stmt.parameters.get("props"), Some(&json!({"proficiency": "native"})));
    }

    #[test]
    fn test_statement_wire_format() {
        let body = serde_json::to_value(wipe()).unwrap();
        assert_eq!(
            body,
            json!({"statement": "MATCH (n) DETACH DELETE n", "parameters": {}})
        );
    }
}
