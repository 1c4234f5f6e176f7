//! Naming conventions: entity names to table names, node labels and
//! identity column names.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{MigrationError, Result};

/// Separator between words of an entity name (`media_resource`).
const WORD_SEPARATOR: char = '_';

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex pattern")
    })
}

/// Table name for an entity: `channel` -> `channels`.
pub fn pluralize(entity: &str) -> String {
    format!("{}s", entity)
}

/// Node label for an entity: `media_resource` -> `MediaResource`.
///
/// Every `_`-separated segment must be non-empty.
pub fn titleize(entity: &str) -> Result<String> {
    let mut label = String::with_capacity(entity.len());

    for word in entity.split(WORD_SEPARATOR) {
        let mut chars = word.chars();
        let first = chars.next().ok_or_else(|| {
            MigrationError::InvalidEntityName(format!(
                "'{}' contains an empty word segment",
                entity
            ))
        })?;
        label.extend(first.to_uppercase());
        label.push_str(chars.as_str());
    }

    Ok(label)
}

/// Numeric identity column: `media_resource` -> `media_resource_id`.
pub fn to_id_column(entity: &str) -> String {
    format!("{}_id", entity)
}

/// Code identity column: `language` -> `language_code`.
pub fn to_code_column(entity: &str) -> String {
    format!("{}_code", entity)
}

/// Reject names that cannot be interpolated into SQL or Cypher verbatim.
pub fn validate_identifier(name: &str) -> Result<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(MigrationError::InvalidEntityName(format!(
            "'{}' must match [A-Za-z_][A-Za-z0-9_]*",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("channel"), "channels");
        assert_eq!(pluralize("person_language"), "person_languages");
    }

    #[test]
    fn test_titleize_one_word() {
        assert_eq!(titleize("channel").unwrap(), "Channel");
    }

    #[test]
    fn test_titleize_multi_word() {
        assert_eq!(titleize("media_resource").unwrap(), "MediaResource");
        assert_eq!(titleize("a_b_c").unwrap(), "ABC");
    }

    #[test]
    fn test_titleize_keeps_inner_case() {
        assert_eq!(titleize("tv_showName").unwrap(), "TvShowName");
    }

    #[test]
    fn test_titleize_empty_segments() {
        for bad in ["", "_", "_person", "person_", "media__resource"] {
            let err = titleize(bad).unwrap_err();
            assert!(
                matches!(err, MigrationError::InvalidEntityName(_)),
                "expected InvalidEntityName for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_to_id_column() {
        assert_eq!(to_id_column("media_resource"), "media_resource_id");
    }

    #[test]
    fn test_to_code_column() {
        assert_eq!(to_code_column("language"), "language_code");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("person_language").is_ok());
        assert!(validate_identifier("SPEAKS").is_ok());
        assert!(validate_identifier("_hidden1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1person").is_err());
        assert!(validate_identifier("person; DROP TABLE x").is_err());
        assert!(validate_identifier("per-son").is_err());
    }
}
