//! Cross-catalog name resolution: turn a partially qualified name plus the
//! session search path into an ordered list of concrete `(catalog, schema)`
//! probe sites, and return the first hit.
//!
//! Probe-site enumeration is separate from probing so that the same
//! machinery serves single-catalog and cross-catalog lookups, and so the
//! set of schemas actually touched is available to the suggestion engine.

use std::sync::Arc;

use itertools::Itertools;
use quill_common::constants::{DEFAULT_SCHEMA, SYSTEM_CATALOG, TEMP_CATALOG};

use crate::catalog::Catalog;
use crate::database_manager::DatabaseManager;
use crate::entry::{CatalogEntry, EntryKind};
use crate::error::{CatalogError, CatalogResult};
use crate::qualified::{is_invalid_catalog, is_invalid_schema};
use crate::schema::SchemaEntry;
use crate::search_path::{CatalogSearchEntry, CatalogSearchPath};
use crate::similar::missing_entry_error;
use crate::txn::catalog_txn::CatalogTxn;

/// Everything resolution needs from the session: the attached-catalog set,
/// the search path, the session's temporary catalog and its default
/// database name.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub manager: &'a DatabaseManager,
    pub search_path: &'a CatalogSearchPath,
    pub temp_catalog: &'a Arc<Catalog>,
    pub default_database: &'a str,
}

impl ResolveContext<'_> {
    /// Catalog by name; the reserved names resolve to the session temp
    /// catalog and the system catalog, an unspecified name to the default
    /// database.
    pub fn get_catalog(&self, name: &str) -> Option<Arc<Catalog>> {
        if name == TEMP_CATALOG {
            return Some(self.temp_catalog.clone());
        }
        if name == SYSTEM_CATALOG {
            return Some(self.manager.system().clone());
        }
        let name = if is_invalid_catalog(name) {
            self.default_database
        } else {
            name
        };
        self.manager.get(name)
    }

    pub fn get_catalog_or_fail(&self, name: &str) -> CatalogResult<Arc<Catalog>> {
        let effective = if is_invalid_catalog(name) {
            self.default_database
        } else {
            name
        };
        self.get_catalog(name)
            .ok_or_else(|| CatalogError::CatalogNotFound {
                name: effective.to_string(),
            })
    }

    /// Every catalog reachable in this session: temp, system, then the
    /// attached list.
    pub fn all_catalogs(&self) -> Vec<Arc<Catalog>> {
        let mut catalogs = vec![self.temp_catalog.clone(), self.manager.system().clone()];
        catalogs.extend(self.manager.list());
        catalogs
    }
}

/// The ordered probe sites for a partially qualified name.
///
/// | catalog | schema | sites |
/// |---------|--------|-------|
/// | -       | -      | the search path, in order |
/// | -       | S      | catalogs listing S, else the default database |
/// | C       | -      | schemas listed for C, else `main` |
/// | C       | S      | exactly `(C, S)` |
pub fn candidate_sites(
    ctx: &ResolveContext<'_>,
    catalog: &str,
    schema: &str,
) -> Vec<CatalogSearchEntry> {
    if is_invalid_catalog(catalog) && is_invalid_schema(schema) {
        return ctx.search_path.get_with_implicit().to_vec();
    }
    if is_invalid_catalog(catalog) {
        let mut sites: Vec<CatalogSearchEntry> = ctx
            .search_path
            .catalogs_for_schema(schema)
            .into_iter()
            .map(|catalog| CatalogSearchEntry::new(catalog, schema))
            .collect();
        if sites.is_empty() {
            sites.push(CatalogSearchEntry::new(ctx.default_database, schema));
        }
        return sites;
    }
    if is_invalid_schema(schema) {
        let mut sites: Vec<CatalogSearchEntry> = schemas_for_catalog_resolved(ctx, catalog)
            .into_iter()
            .map(|schema| CatalogSearchEntry::new(catalog, schema))
            .collect();
        if sites.is_empty() {
            sites.push(CatalogSearchEntry::new(catalog, DEFAULT_SCHEMA));
        }
        return sites;
    }
    vec![CatalogSearchEntry::new(catalog, schema)]
}

/// Schemas the path lists for a catalog, counting entries with an
/// unspecified catalog towards the session default database.
fn schemas_for_catalog_resolved(ctx: &ResolveContext<'_>, catalog: &str) -> Vec<String> {
    ctx.search_path
        .get_with_implicit()
        .iter()
        .filter(|entry| {
            let effective = if is_invalid_catalog(&entry.catalog) {
                ctx.default_database
            } else {
                entry.catalog.as_str()
            };
            effective == catalog
        })
        .map(|entry| entry.schema.clone())
        .collect()
}

/// A successful lookup: the entry together with where it was found.
#[derive(Debug, Clone)]
pub struct CatalogEntryLookup {
    pub catalog: Arc<Catalog>,
    pub schema: Arc<SchemaEntry>,
    pub entry: Arc<CatalogEntry>,
}

/// Resolve an entry across catalogs. With `if_exists`, absence (of the
/// entry, or of a named catalog) is `Ok(None)`; otherwise the error carries
/// a suggestion synthesised from the schemas that were actually probed.
pub fn lookup_entry(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
    kind: EntryKind,
    catalog: &str,
    schema: &str,
    name: &str,
    if_exists: bool,
) -> CatalogResult<Option<CatalogEntryLookup>> {
    txn.check_interrupted()?;
    let sites = candidate_sites(ctx, catalog, schema);
    let mut visited: Vec<(Arc<Catalog>, Arc<SchemaEntry>)> = Vec::new();
    for site in &sites {
        let catalog = if if_exists {
            match ctx.get_catalog(&site.catalog) {
                Some(catalog) => catalog,
                None => return Ok(None),
            }
        } else {
            ctx.get_catalog_or_fail(&site.catalog)?
        };
        let (schema_entry, entry) = catalog.lookup_entry_internal(txn, kind, &site.schema, name)?;
        if let Some(schema_entry) = schema_entry {
            if let Some(entry) = entry {
                return Ok(Some(CatalogEntryLookup {
                    catalog,
                    schema: schema_entry,
                    entry,
                }));
            }
            visited.push((catalog, schema_entry));
        }
    }
    if if_exists {
        return Ok(None);
    }
    Err(missing_entry_error(ctx, txn, kind, name, &visited))
}

/// Resolve an entry within one already-chosen catalog, still honouring the
/// search path for an unspecified schema. Used by DDL that has picked its
/// catalog before touching the entry.
pub fn lookup_entry_in_catalog(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
    catalog: &Arc<Catalog>,
    kind: EntryKind,
    schema: &str,
    name: &str,
    if_exists: bool,
) -> CatalogResult<Option<CatalogEntryLookup>> {
    txn.check_interrupted()?;
    let schemas = if is_invalid_schema(schema) {
        let mut schemas = schemas_for_catalog_resolved(ctx, catalog.name());
        if schemas.is_empty() {
            schemas.push(DEFAULT_SCHEMA.to_string());
        }
        schemas
    } else {
        vec![schema.to_string()]
    };
    let mut visited: Vec<(Arc<Catalog>, Arc<SchemaEntry>)> = Vec::new();
    for schema_name in &schemas {
        let (schema_entry, entry) = catalog.lookup_entry_internal(txn, kind, schema_name, name)?;
        if let Some(schema_entry) = schema_entry {
            if let Some(entry) = entry {
                return Ok(Some(CatalogEntryLookup {
                    catalog: catalog.clone(),
                    schema: schema_entry,
                    entry,
                }));
            }
            visited.push((catalog.clone(), schema_entry));
        }
    }
    if if_exists {
        return Ok(None);
    }
    Err(missing_entry_error(ctx, txn, kind, name, &visited))
}

/// Resolve a schema across catalogs. Only the last probe site reports the
/// miss, so its catalog supplies the suggestion.
pub fn resolve_schema(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
    catalog: &str,
    schema: &str,
    if_exists: bool,
) -> CatalogResult<Option<(Arc<Catalog>, Arc<SchemaEntry>)>> {
    txn.check_interrupted()?;
    let sites = candidate_sites(ctx, catalog, schema);
    for (i, site) in sites.iter().enumerate() {
        let last = i + 1 == sites.len();
        let catalog = if if_exists {
            match ctx.get_catalog(&site.catalog) {
                Some(catalog) => catalog,
                None => return Ok(None),
            }
        } else {
            ctx.get_catalog_or_fail(&site.catalog)?
        };
        let probe_if_exists = !last || if_exists;
        if let Some(schema_entry) = catalog.get_schema(txn, &site.schema, probe_if_exists)? {
            return Ok(Some((catalog, schema_entry)));
        }
    }
    Ok(None)
}

/// Schemas of one catalog, or of every catalog on the search path when the
/// catalog is unspecified (deduplicated, path order).
pub fn list_schemas(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
    catalog: &str,
) -> CatalogResult<Vec<(Arc<Catalog>, Arc<SchemaEntry>)>> {
    let mut catalogs: Vec<Arc<Catalog>> = Vec::new();
    if is_invalid_catalog(catalog) {
        for entry in ctx
            .search_path
            .get_with_implicit()
            .iter()
            .unique_by(|entry| &entry.catalog)
        {
            catalogs.push(ctx.get_catalog_or_fail(&entry.catalog)?);
        }
    } else {
        catalogs.push(ctx.get_catalog_or_fail(catalog)?);
    }
    let mut result = Vec::new();
    for catalog in catalogs {
        for schema in catalog.schemas(txn) {
            result.push((catalog.clone(), schema));
        }
    }
    Ok(result)
}

/// Every schema of every reachable catalog, sorted by
/// `(catalog_name, schema_name)`.
pub fn list_all_schemas(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
) -> Vec<(Arc<Catalog>, Arc<SchemaEntry>)> {
    let mut result: Vec<(Arc<Catalog>, Arc<SchemaEntry>)> = Vec::new();
    for catalog in ctx.all_catalogs() {
        for schema in catalog.schemas(txn) {
            result.push((catalog.clone(), schema));
        }
    }
    result.sort_by(|(ca, sa), (cb, sb)| {
        (ca.name(), sa.name()).cmp(&(cb.name(), sb.name()))
    });
    result
}
