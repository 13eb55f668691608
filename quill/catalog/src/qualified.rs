//! Three-part names `<catalog>.<schema>.<entry>` with sentinel values for
//! the unspecified parts. The predicates here are the only place that
//! inspects the sentinels.

use quill_common::constants::{INVALID_CATALOG, INVALID_SCHEMA};
use serde::{Deserialize, Serialize};

#[inline]
pub fn is_invalid_catalog(name: &str) -> bool {
    name == INVALID_CATALOG
}

#[inline]
pub fn is_invalid_schema(name: &str) -> bool {
    name == INVALID_SCHEMA
}

/// A possibly-partial three-part name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub catalog: String,
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            catalog: INVALID_CATALOG.to_string(),
            schema: INVALID_SCHEMA.to_string(),
            name: name.into(),
        }
    }

    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Display string with exactly the requested qualification.
    pub fn format(&self, qualify_database: bool, qualify_schema: bool) -> String {
        format_qualified(
            &self.catalog,
            &self.schema,
            &self.name,
            qualify_database,
            qualify_schema,
        )
    }
}

/// Minimally-qualified display string. Qualifying the database forces the
/// schema in as well, since `a.b` always reads as `<schema>.<entry>`.
pub fn format_qualified(
    catalog: &str,
    schema: &str,
    name: &str,
    qualify_database: bool,
    qualify_schema: bool,
) -> String {
    let mut result = String::new();
    if qualify_database {
        result.push_str(catalog);
        result.push('.');
    }
    if qualify_database || qualify_schema {
        result.push_str(schema);
        result.push('.');
    }
    result.push_str(name);
    result
}
