//! The per-session ordered list of `(catalog, schema)` probe sites used
//! when a name is partially qualified.

use std::fmt;

use quill_common::constants::{DEFAULT_SCHEMA, INVALID_CATALOG, SYSTEM_CATALOG, TEMP_CATALOG};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::qualified::is_invalid_catalog;

/// One probe site. An invalid catalog means "the session's default
/// database" and is resolved at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSearchEntry {
    pub catalog: String,
    pub schema: String,
}

impl CatalogSearchEntry {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }

    pub fn schema_only(schema: impl Into<String>) -> Self {
        Self::new(INVALID_CATALOG, schema)
    }

    /// Parse `schema` or `catalog.schema`.
    pub fn parse(input: &str) -> CatalogResult<Self> {
        let parts: Vec<&str> = input.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [schema] if !schema.is_empty() => Ok(Self::schema_only(*schema)),
            [catalog, schema] if !catalog.is_empty() && !schema.is_empty() => {
                Ok(Self::new(*catalog, *schema))
            }
            _ => Err(CatalogError::InvalidArgument {
                reason: format!("expected \"schema\" or \"catalog.schema\", got \"{input}\""),
            }),
        }
    }

    /// Parse a comma-separated list of entries.
    pub fn parse_list(input: &str) -> CatalogResult<Vec<Self>> {
        input.split(',').map(CatalogSearchEntry::parse).collect()
    }
}

impl fmt::Display for CatalogSearchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_invalid_catalog(&self.catalog) {
            write!(f, "{}", self.schema)
        } else {
            write!(f, "{}.{}", self.catalog, self.schema)
        }
    }
}

/// The session search path. The user-set list is bracketed internally by
/// `temp.main` at the front and `system.main` at the back so temporary
/// objects shadow and built-ins always resolve; `get` hides the brackets.
#[derive(Debug, Clone)]
pub struct CatalogSearchPath {
    set_paths: Vec<CatalogSearchEntry>,
    paths: Vec<CatalogSearchEntry>,
}

impl CatalogSearchPath {
    pub fn new() -> Self {
        let mut path = Self {
            set_paths: Vec::new(),
            paths: Vec::new(),
        };
        path.reset();
        path
    }

    pub fn reset(&mut self) {
        self.apply(vec![CatalogSearchEntry::schema_only(DEFAULT_SCHEMA)]);
    }

    /// Replace the user-set list. Empty lists are rejected.
    pub fn set(&mut self, new_paths: Vec<CatalogSearchEntry>) -> CatalogResult<()> {
        if new_paths.is_empty() {
            return Err(CatalogError::InvalidArgument {
                reason: "search path cannot be empty".to_string(),
            });
        }
        self.apply(new_paths);
        Ok(())
    }

    fn apply(&mut self, new_paths: Vec<CatalogSearchEntry>) {
        self.paths = Vec::with_capacity(new_paths.len() + 2);
        self.paths
            .push(CatalogSearchEntry::new(TEMP_CATALOG, DEFAULT_SCHEMA));
        self.paths.extend(new_paths.iter().cloned());
        self.paths
            .push(CatalogSearchEntry::new(SYSTEM_CATALOG, DEFAULT_SCHEMA));
        self.set_paths = new_paths;
    }

    /// The user-set list, implicit entries hidden.
    #[inline]
    pub fn get(&self) -> &[CatalogSearchEntry] {
        &self.set_paths
    }

    /// The full probe list, implicit entries included; this is what the
    /// resolver iterates.
    #[inline]
    pub fn get_with_implicit(&self) -> &[CatalogSearchEntry] {
        &self.paths
    }

    /// Schemas listed for a given catalog, in path order.
    pub fn schemas_for_catalog(&self, catalog: &str) -> Vec<String> {
        self.paths
            .iter()
            .filter(|entry| entry.catalog == catalog)
            .map(|entry| entry.schema.clone())
            .collect()
    }

    /// Catalogs listing a given schema, in path order.
    pub fn catalogs_for_schema(&self, schema: &str) -> Vec<String> {
        self.paths
            .iter()
            .filter(|entry| entry.schema == schema)
            .map(|entry| entry.catalog.clone())
            .collect()
    }
}

impl Default for CatalogSearchPath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_hides_implicit_entries() {
        let mut path = CatalogSearchPath::new();
        path.set(vec![CatalogSearchEntry::new("db1", "main")]).unwrap();
        assert_eq!(path.get(), &[CatalogSearchEntry::new("db1", "main")]);

        let full = path.get_with_implicit();
        assert_eq!(full.first().unwrap().catalog, TEMP_CATALOG);
        assert_eq!(full.last().unwrap().catalog, SYSTEM_CATALOG);
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut path = CatalogSearchPath::new();
        assert!(matches!(
            path.set(vec![]),
            Err(CatalogError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn parse_entries() {
        assert_eq!(
            CatalogSearchEntry::parse("s1").unwrap(),
            CatalogSearchEntry::schema_only("s1")
        );
        assert_eq!(
            CatalogSearchEntry::parse("db1.s1").unwrap(),
            CatalogSearchEntry::new("db1", "s1")
        );
        assert!(CatalogSearchEntry::parse("a.b.c").is_err());
        assert!(CatalogSearchEntry::parse("").is_err());

        let list = CatalogSearchEntry::parse_list("s1, db2.s2").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1], CatalogSearchEntry::new("db2", "s2"));
    }

    #[test]
    fn per_catalog_and_per_schema_views() {
        let mut path = CatalogSearchPath::new();
        path.set(vec![
            CatalogSearchEntry::new("db1", "s1"),
            CatalogSearchEntry::new("db1", "s2"),
            CatalogSearchEntry::new("db2", "s1"),
        ])
        .unwrap();
        assert_eq!(path.schemas_for_catalog("db1"), vec!["s1", "s2"]);
        assert_eq!(path.catalogs_for_schema("s1"), vec!["db1", "db2"]);
    }
}
