use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Query surface of the external knowledge store.
///
/// Implementations must be shareable across audit workers. Table names
/// passed here are physical names; use [`TableShim`] to resolve the logical
/// names policy authors write.
pub trait KnowledgeStore: Send + Sync {
    /// Number of rows in a table.
    fn count_rows(&self, table: &str) -> Result<u64, StoreError>;

    /// Key values that occur more than once in `key_column`, ordered by key.
    fn duplicate_keys(&self, table: &str, key_column: &str) -> Result<Vec<DuplicateKey>, StoreError>;

    /// Keys of rows whose `required_column` is NULL or empty, optionally
    /// restricted to rows matching `filter`. Ordered by key.
    fn missing_values(
        &self,
        table: &str,
        key_column: &str,
        required_column: &str,
        filter: Option<&ColumnFilter>,
    ) -> Result<Vec<String>, StoreError>;

    /// Existence probe for a table.
    fn table_exists(&self, table: &str) -> Result<bool, StoreError>;
}

/// A key value seen more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub key: String,
    pub count: u64,
}

/// Equality filter on a column, compared as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

/// Errors raised by knowledge store queries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The table (relation) does not exist. Distinct from an empty table.
    #[error("table missing: {0}")]
    TableMissing(String),

    #[error("knowledge store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Remaps logical collection names to their current physical names.
///
/// Unmapped names resolve to themselves, so rule text never has to change
/// when a table is renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableShim(BTreeMap<String, String>);

impl TableShim {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    pub fn resolve<'a>(&'a self, logical: &'a str) -> &'a str {
        self.0.get(logical).map(String::as_str).unwrap_or(logical)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validate a (possibly schema-qualified) SQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if !name.is_empty() && name.split('.').all(valid_part) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Quote a validated identifier, handling `schema.table`.
pub fn quote_identifier(name: &str) -> Result<String, StoreError> {
    validate_identifier(name)?;
    Ok(name
        .split('.')
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shim_resolves_mapped_and_passthrough() {
        let mut map = BTreeMap::new();
        map.insert("symbols".to_string(), "core_symbols_v2".to_string());
        let shim = TableShim::new(map);
        assert_eq!(shim.resolve("symbols"), "core_symbols_v2");
        assert_eq!(shim.resolve("capabilities"), "capabilities");
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("symbols").is_ok());
        assert!(validate_identifier("core.symbols_v2").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("x; DROP TABLE y").is_err());
        assert!(validate_identifier("a..b").is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("core.symbols").unwrap(), "\"core\".\"symbols\"");
    }
}
