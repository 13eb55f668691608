//! "Did you mean" synthesis for missed lookups, in three layers: closest
//! match in the schemas that were probed, closest match anywhere (shown
//! minimally qualified), and the static extension registry for function
//! names. Best-effort throughout; an empty hint never masks the miss.

use std::sync::Arc;

use quill_common::constants::{INVALID_CATALOG, INVALID_SCHEMA};

use crate::catalog::Catalog;
use crate::entry::EntryKind;
use crate::error::CatalogError;
use crate::extension::find_extension_for_function;
use crate::qualified::{format_qualified, is_invalid_catalog};
use crate::resolve::{ResolveContext, candidate_sites, list_all_schemas};
use crate::schema::SchemaEntry;
use crate::txn::catalog_txn::CatalogTxn;

/// A closest-match candidate with the site it was found at.
#[derive(Debug, Clone)]
pub struct SimilarEntry {
    pub name: String,
    pub distance: usize,
    pub catalog: String,
    pub schema: String,
}

/// Best match for `name` across the given schemas, in order; earlier
/// schemas win ties.
pub fn similar_entry_in_schemas(
    txn: &CatalogTxn,
    kind: EntryKind,
    name: &str,
    schemas: &[(Arc<Catalog>, Arc<SchemaEntry>)],
) -> Option<SimilarEntry> {
    let mut best: Option<SimilarEntry> = None;
    for (catalog, schema) in schemas {
        let Some(hit) = schema.similar_entry(txn, kind, name) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
            best = Some(SimilarEntry {
                name: hit.name,
                distance: hit.distance,
                catalog: catalog.name().to_string(),
                schema: schema.name().to_string(),
            });
        }
    }
    best
}

/// The smallest qualification that makes `(catalog, schema)` reachable
/// under the current search path: schema-only when the schema name alone
/// already probes that site, catalog-only when the catalog's schema list
/// covers it, both otherwise.
pub fn find_minimal_qualification(
    ctx: &ResolveContext<'_>,
    catalog_name: &str,
    schema_name: &str,
) -> (bool, bool) {
    let matches_site = |sites: &[crate::search_path::CatalogSearchEntry]| {
        sites.iter().any(|site| {
            let effective = if is_invalid_catalog(&site.catalog) {
                ctx.default_database
            } else {
                site.catalog.as_str()
            };
            effective == catalog_name && site.schema == schema_name
        })
    };
    if matches_site(&candidate_sites(ctx, INVALID_CATALOG, schema_name)) {
        return (false, true);
    }
    if matches_site(&candidate_sites(ctx, catalog_name, INVALID_SCHEMA)) {
        return (true, false);
    }
    (true, true)
}

/// Build the decorated not-found error for a missed entry lookup.
pub fn missing_entry_error(
    ctx: &ResolveContext<'_>,
    txn: &CatalogTxn,
    kind: EntryKind,
    name: &str,
    visited: &[(Arc<Catalog>, Arc<SchemaEntry>)],
) -> CatalogError {
    // Function names ship with extensions often enough that the registry
    // hint beats any fuzzy match.
    if kind.is_function() {
        let extension = find_extension_for_function(name);
        if !extension.is_empty() {
            return CatalogError::NotInCatalogButInExtension {
                what: "Function".to_string(),
                name: name.to_string(),
                extension: extension.to_string(),
            };
        }
    }

    let local = similar_entry_in_schemas(txn, kind, name, visited);
    let local_distance = local.as_ref().map(|l| l.distance).unwrap_or(usize::MAX);

    // Scan every schema of every catalog in deterministic
    // (catalog_name, schema_name) order.
    let all = list_all_schemas(ctx, txn);
    let unseen = similar_entry_in_schemas(txn, kind, name, &all);

    let suggestion = match (unseen, local) {
        (Some(unseen), _) if unseen.distance < local_distance => {
            // The closest match is outside the visited sites; qualify it
            // just enough to be unambiguous.
            let (qualify_database, qualify_schema) =
                find_minimal_qualification(ctx, &unseen.catalog, &unseen.schema);
            let qualified = format_qualified(
                &unseen.catalog,
                &unseen.schema,
                &unseen.name,
                qualify_database,
                qualify_schema,
            );
            format!("\nDid you mean \"{qualified}\"?")
        }
        (_, Some(local)) => format!("\nDid you mean \"{}\"?", local.name),
        _ => String::new(),
    };

    CatalogError::EntryNotFound {
        kind,
        name: name.to_string(),
        suggestion,
    }
}
