//! Column classification and decoding of intermediate-table rows.

use crate::config::MappingConfig;
use crate::error::{MigrationError, Result};
use crate::graph::{Identity, Properties, PropertyValue};
use crate::naming;
use crate::source::{SourceRow, SqlValue};

/// Role a column plays for the current mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// `<from>_id`
    FromIdentity,
    /// `<to>_id`
    ToIdentity,
    /// `<to>_code`
    ToCode,
    Property,
}

/// Identity column names of one mapping, computed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub from_id_column: String,
    pub to_id_column: String,
    pub to_code_column: String,
}

impl ColumnRoles {
    pub fn new(mapping: &MappingConfig) -> Self {
        Self {
            from_id_column: naming::to_id_column(&mapping.from_entity),
            to_id_column: naming::to_id_column(&mapping.to_entity),
            to_code_column: naming::to_code_column(&mapping.to_entity),
        }
    }

    pub fn classify(&self, column: &str) -> ColumnRole {
        if column == self.from_id_column {
            ColumnRole::FromIdentity
        } else if column == self.to_id_column {
            ColumnRole::ToIdentity
        } else if column == self.to_code_column {
            ColumnRole::ToCode
        } else {
            ColumnRole::Property
        }
    }

    /// Split a row into endpoint identities and relationship properties.
    ///
    /// Null columns are skipped entirely. When both `<to>_id` and
    /// `<to>_code` are set the code is used, whatever the column order.
    pub fn decode(&self, row: &SourceRow) -> Result<DecodedRow> {
        let mut decoded = DecodedRow::default();
        let mut to_numeric = None;
        let mut to_code = None;

        for (column, value) in &row.values {
            if matches!(value, SqlValue::Null) {
                continue;
            }
            match self.classify(column) {
                ColumnRole::FromIdentity => {
                    decoded.from = Some(numeric_identity(column, value)?);
                }
                ColumnRole::ToIdentity => {
                    to_numeric = Some(numeric_identity(column, value)?);
                }
                ColumnRole::ToCode => {
                    to_code = Some(code_identity(column, value)?);
                }
                ColumnRole::Property => {
                    if let Some(property) = property_value(value) {
                        decoded.properties.insert(column.clone(), property);
                    }
                }
            }
        }

        decoded.to = to_code.or(to_numeric);
        Ok(decoded)
    }
}

/// A row split by column role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRow {
    pub from: Option<Identity>,
    pub to: Option<Identity>,
    pub properties: Properties,
}

/// Decode raw bytes to text, replacing invalid UTF-8.
pub fn decode_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn numeric_identity(column: &str, value: &SqlValue) -> Result<Identity> {
    match value {
        SqlValue::Integer(id) => Ok(Identity::Numeric(*id)),
        other => Err(MigrationError::InvalidIdentity(format!(
            "{} must hold an integer, got {:?}",
            column, other
        ))),
    }
}

fn code_identity(column: &str, value: &SqlValue) -> Result<Identity> {
    match value {
        SqlValue::Text(code) => Ok(Identity::Code(code.clone())),
        SqlValue::Bytes(bytes) => Ok(Identity::Code(decode_bytes(bytes))),
        other => Err(MigrationError::InvalidIdentity(format!(
            "{} must hold text, got {:?}",
            column, other
        ))),
    }
}

fn property_value(value: &SqlValue) -> Option<PropertyValue> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(PropertyValue::Integer(*i)),
        SqlValue::Real(f) if f.is_finite() => Some(PropertyValue::Float(*f)),
        // Neo4j parameters cannot carry inf/NaN
        SqlValue::Real(f) => Some(PropertyValue::Text(f.to_string())),
        SqlValue::Text(t) => Some(PropertyValue::Text(t.clone())),
        SqlValue::Bytes(b) => Some(PropertyValue::Text(decode_bytes(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> ColumnRoles {
        ColumnRoles::new(&MappingConfig {
            from_entity: "person".to_string(),
            to_entity: "language".to_string(),
            intermediate_entity: "person_language".to_string(),
            relation_name: "SPEAKS".to_string(),
        })
    }

    fn row(values: Vec<(&str, SqlValue)>) -> SourceRow {
        SourceRow::new(
            values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(decode_bytes(&[104, 101, 108, 108, 111]), "hello");
    }

    #[test]
    fn test_classify() {
        let roles = roles();
        assert_eq!(roles.classify("person_id"), ColumnRole::FromIdentity);
        assert_eq!(roles.classify("language_id"), ColumnRole::ToIdentity);
        assert_eq!(roles.classify("language_code"), ColumnRole::ToCode);
        assert_eq!(roles.classify("person_code"), ColumnRole::Property);
        assert_eq!(roles.classify("proficiency"), ColumnRole::Property);
    }

    #[test]
    fn test_decode_code_row() {
        let decoded = roles()
            .decode(&row(vec![
                ("person_id", SqlValue::Integer(1)),
                ("language_code", SqlValue::Bytes(b"en".to_vec())),
                ("proficiency", SqlValue::Text("native".to_string())),
                ("years", SqlValue::Integer(30)),
            ]))
            .unwrap();

        assert_eq!(decoded.from, Some(Identity::Numeric(1)));
        assert_eq!(decoded.to, Some(Identity::Code("en".to_string())));
        assert_eq!(decoded.properties.len(), 2);
        assert_eq!(
            decoded.properties.get("proficiency"),
            Some(&PropertyValue::Text("native".to_string()))
        );
        assert_eq!(decoded.properties.get("years"), Some(&PropertyValue::Integer(30)));
    }

    #[test]
    fn test_nulls_are_skipped() {
        let decoded = roles()
            .decode(&row(vec![
                ("person_id", SqlValue::Integer(1)),
                ("language_id", SqlValue::Null),
                ("language_code", SqlValue::Null),
                ("proficiency", SqlValue::Null),
            ]))
            .unwrap();

        assert_eq!(decoded.from, Some(Identity::Numeric(1)));
        assert_eq!(decoded.to, None);
        assert!(decoded.properties.is_empty());
    }

    #[test]
    fn test_code_wins_over_numeric_in_any_order() {
        let code_last = row(vec![
            ("language_id", SqlValue::Integer(9)),
            ("language_code", SqlValue::Text("fr".to_string())),
        ]);
        let code_first = row(vec![
            ("language_code", SqlValue::Text("fr".to_string())),
            ("language_id", SqlValue::Integer(9)),
        ]);

        let expected = Some(Identity::Code("fr".to_string()));
        assert_eq!(roles().decode(&code_last).unwrap().to, expected);
        assert_eq!(roles().decode(&code_first).unwrap().to, expected);
    }

    #[test]
    fn test_numeric_when_code_is_null() {
        let decoded = roles()
            .decode(&row(vec![
                ("language_id", SqlValue::Integer(9)),
                ("language_code", SqlValue::Null),
            ]))
            .unwrap();
        assert_eq!(decoded.to, Some(Identity::Numeric(9)));
    }

    #[test]
    fn test_bytes_property_decoded() {
        let decoded = roles()
            .decode(&row(vec![("note", SqlValue::Bytes(b"hello".to_vec()))]))
            .unwrap();
        assert_eq!(
            decoded.properties.get("note"),
            Some(&PropertyValue::Text("hello".to_string()))
        );
    }

    #[test]
    fn test_non_finite_real_becomes_text() {
        let decoded = roles()
            .decode(&row(vec![
                ("score", SqlValue::Real(f64::NEG_INFINITY)),
                ("weight", SqlValue::Real(0.25)),
            ]))
            .unwrap();
        assert_eq!(
            decoded.properties.get("score"),
            Some(&PropertyValue::Text("-inf".to_string()))
        );
        assert_eq!(decoded.properties.get("weight"), Some(&PropertyValue::Float(0.25)));
    }

    #[test]
    fn test_non_integer_id_is_invalid() {
        let result = roles().decode(&row(vec![("person_id", SqlValue::Text("1".to_string()))]));
        assert!(matches!(result, Err(MigrationError::InvalidIdentity(_))));
    }

    #[test]
    fn test_non_text_code_is_invalid() {
        let result = roles().decode(&row(vec![("language_code", SqlValue::Real(1.5))]));
        assert!(matches!(result, Err(MigrationError::InvalidIdentity(_))));
    }
}
