//! End-to-end resolution and diagnostics over attached catalogs, exercised
//! through the same context bundle the session layer hands the resolver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quill_catalog::catalog::Catalog;
use quill_catalog::database_manager::DatabaseManager;
use quill_catalog::entry::{ColumnDefinition, EntryKind, EntryPayload};
use quill_catalog::error::CatalogError;
use quill_catalog::info::{
    AlterInfo, CreateInfoBase, CreateSchemaInfo, CreateTableInfo, DropInfo, OnCreateConflict,
};
use quill_catalog::resolve::{self, ResolveContext};
use quill_catalog::search_path::{CatalogSearchEntry, CatalogSearchPath};
use quill_catalog::txn::catalog_txn::CatalogTxn;
use quill_common::constants::{DEFAULT_SCHEMA, INVALID_CATALOG, INVALID_SCHEMA};
use quill_common::data_type::LogicalType;
use quill_common::{IsolationLevel, Transaction};

struct Harness {
    manager: Arc<DatabaseManager>,
    temp: Arc<Catalog>,
    path: CatalogSearchPath,
    default_database: String,
}

impl Harness {
    fn new(default_database: &str) -> Self {
        let manager = Arc::new(DatabaseManager::new().unwrap());
        let temp = Arc::new(Catalog::new_temporary());
        let txn = manager
            .txn_manager()
            .begin_transaction(IsolationLevel::Snapshot)
            .unwrap();
        temp.create_schema(&txn, &CreateSchemaInfo {
            base: CreateInfoBase::new(DEFAULT_SCHEMA),
        })
        .unwrap();
        txn.commit().unwrap();
        Self {
            manager,
            temp,
            path: CatalogSearchPath::new(),
            default_database: default_database.to_string(),
        }
    }

    fn ctx(&self) -> ResolveContext<'_> {
        ResolveContext {
            manager: &self.manager,
            search_path: &self.path,
            temp_catalog: &self.temp,
            default_database: &self.default_database,
        }
    }

    fn begin(&self) -> Arc<CatalogTxn> {
        self.manager
            .txn_manager()
            .begin_transaction(IsolationLevel::Snapshot)
            .unwrap()
    }

    fn attach(&self, name: &str) -> Arc<Catalog> {
        let catalog = Arc::new(Catalog::new(name));
        let txn = self.begin();
        catalog
            .create_schema(&txn, &CreateSchemaInfo {
                base: CreateInfoBase::new(DEFAULT_SCHEMA),
            })
            .unwrap();
        txn.commit().unwrap();
        self.manager.attach(catalog.clone()).unwrap();
        catalog
    }

    fn create_table(&self, catalog: &Catalog, schema: &str, name: &str) {
        let txn = self.begin();
        catalog
            .create_table(&txn, &CreateTableInfo {
                base: CreateInfoBase::new(name).with_schema(schema),
                columns: vec![ColumnDefinition::new("id", LogicalType::Int64)],
            })
            .unwrap();
        txn.commit().unwrap();
    }
}

fn resolve_err(harness: &Harness, kind: EntryKind, catalog: &str, name: &str) -> CatalogError {
    let txn = harness.begin();
    resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        kind,
        catalog,
        INVALID_SCHEMA,
        name,
        false,
    )
    .unwrap_err()
}

#[test]
fn local_suggestion_for_misspelled_table() {
    let harness = Harness::new("main");
    let catalog = harness.attach("main");
    harness.create_table(&catalog, DEFAULT_SCHEMA, "customers");

    let err = resolve_err(&harness, EntryKind::Table, INVALID_CATALOG, "custmers");
    assert_eq!(
        err.to_string(),
        "Table with name custmers does not exist!\nDid you mean \"customers\"?"
    );
}

#[test]
fn explicit_catalog_keeps_suggestion_unqualified() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    let db2 = harness.attach("db2");
    harness.create_table(&db1, DEFAULT_SCHEMA, "orders");
    harness.create_table(&db2, DEFAULT_SCHEMA, "orders");

    let err = resolve_err(&harness, EntryKind::Table, "db2", "oders");
    assert_eq!(
        err.to_string(),
        "Table with name oders does not exist!\nDid you mean \"orders\"?"
    );
}

#[test]
fn out_of_path_suggestion_is_fully_qualified() {
    let harness = Harness::new("db1");
    harness.attach("db1");
    let db2 = harness.attach("db2");
    let txn = harness.begin();
    db2.create_schema(&txn, &CreateSchemaInfo {
        base: CreateInfoBase::new("s2"),
    })
    .unwrap();
    txn.commit().unwrap();
    harness.create_table(&db2, "s2", "widgets");

    let err = resolve_err(&harness, EntryKind::Table, INVALID_CATALOG, "widgets");
    assert_eq!(
        err.to_string(),
        "Table with name widgets does not exist!\nDid you mean \"db2.s2.widgets\"?"
    );
}

#[test]
fn schema_qualification_suffices_when_schema_is_on_no_path() {
    // The same schema name exists in the default catalog, so naming the
    // schema alone reaches the match.
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    let txn = harness.begin();
    db1.create_schema(&txn, &CreateSchemaInfo {
        base: CreateInfoBase::new("s2"),
    })
    .unwrap();
    txn.commit().unwrap();
    harness.create_table(&db1, "s2", "widgets");

    let err = resolve_err(&harness, EntryKind::Table, INVALID_CATALOG, "widgets");
    assert_eq!(
        err.to_string(),
        "Table with name widgets does not exist!\nDid you mean \"s2.widgets\"?"
    );
}

#[test]
fn missing_function_points_at_extension() {
    let harness = Harness::new("db1");
    harness.attach("db1");

    let err = resolve_err(&harness, EntryKind::ScalarFunction, INVALID_CATALOG, "h3_latlng");
    assert_eq!(
        err.to_string(),
        "Function with name \"h3_latlng\" is not in the catalog, but it exists in the h3 extension.\n\nTo install and load the extension, run:\nINSTALL h3;\nLOAD h3;"
    );
}

#[test]
fn missing_catalog_error_message() {
    let harness = Harness::new("db1");
    harness.attach("db1");
    let err = harness.ctx().get_catalog_or_fail("db9").unwrap_err();
    assert_eq!(err.to_string(), "Catalog \"db9\" does not exist!");
}

#[test]
fn sealed_system_catalog_rejects_create_table() {
    let harness = Harness::new("db1");
    harness.attach("db1");
    harness.manager.seal_system();

    let txn = harness.begin();
    let err = harness
        .manager
        .system()
        .create_table(&txn, &CreateTableInfo {
            base: CreateInfoBase::new("t"),
            columns: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::PermissionDenied { .. }));
}

#[test]
fn drop_in_other_session_is_seen_after_commit() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    harness.create_table(&db1, DEFAULT_SCHEMA, "t");

    // Another session drops the table and commits.
    let other = harness.begin();
    db1.drop_entry(
        &other,
        &DropInfo::new(EntryKind::Table, "t").with_schema(DEFAULT_SCHEMA),
    )
    .unwrap();
    other.commit().unwrap();

    // A fresh snapshot no longer resolves it.
    let txn = harness.begin();
    let err = resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        EntryKind::Table,
        INVALID_CATALOG,
        INVALID_SCHEMA,
        "t",
        false,
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::EntryNotFound { .. }));
}

#[test]
fn if_exists_lookup_never_raises() {
    let harness = Harness::new("db1");
    harness.attach("db1");
    let txn = harness.begin();
    let result = resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        EntryKind::Table,
        INVALID_CATALOG,
        INVALID_SCHEMA,
        "no_such_table",
        true,
    )
    .unwrap();
    assert!(result.is_none());

    // Even a missing catalog qualifier yields absence rather than an error.
    let result = resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        EntryKind::Table,
        "db9",
        INVALID_SCHEMA,
        "no_such_table",
        true,
    )
    .unwrap();
    assert!(result.is_none());
}

#[test]
fn candidate_sites_cover_the_search_path() {
    let mut harness = Harness::new("db1");
    harness.attach("db1");
    harness.attach("db2");
    harness
        .path
        .set(vec![
            CatalogSearchEntry::new("db1", DEFAULT_SCHEMA),
            CatalogSearchEntry::new("db2", DEFAULT_SCHEMA),
        ])
        .unwrap();

    let sites = resolve::candidate_sites(&harness.ctx(), INVALID_CATALOG, INVALID_SCHEMA);
    for entry in harness.path.get() {
        assert!(sites.contains(entry));
    }
}

#[test]
fn explicit_site_enumeration_rows() {
    let mut harness = Harness::new("db1");
    harness.attach("db1");
    harness.attach("db2");
    harness
        .path
        .set(vec![
            CatalogSearchEntry::new("db1", "s1"),
            CatalogSearchEntry::new("db2", "s1"),
        ])
        .unwrap();
    let ctx = harness.ctx();

    // Schema given: every catalog listing it, in path order.
    let sites = resolve::candidate_sites(&ctx, INVALID_CATALOG, "s1");
    assert_eq!(sites, vec![
        CatalogSearchEntry::new("db1", "s1"),
        CatalogSearchEntry::new("db2", "s1"),
    ]);

    // Schema absent from the path: the default database fallback.
    let sites = resolve::candidate_sites(&ctx, INVALID_CATALOG, "elsewhere");
    assert_eq!(sites, vec![CatalogSearchEntry::new("db1", "elsewhere")]);

    // Catalog given: its schemas from the path, else `main`.
    let sites = resolve::candidate_sites(&ctx, "db2", INVALID_SCHEMA);
    assert_eq!(sites, vec![CatalogSearchEntry::new("db2", "s1")]);
    let sites = resolve::candidate_sites(&ctx, "db9", INVALID_SCHEMA);
    assert_eq!(sites, vec![CatalogSearchEntry::new("db9", DEFAULT_SCHEMA)]);

    // Fully qualified: exactly one site.
    let sites = resolve::candidate_sites(&ctx, "db2", "s9");
    assert_eq!(sites, vec![CatalogSearchEntry::new("db2", "s9")]);
}

#[test]
fn version_reflects_resolution_snapshot() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    let version_before = db1.version();
    harness.create_table(&db1, DEFAULT_SCHEMA, "t");

    let txn = harness.begin();
    let lookup = resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        EntryKind::Table,
        INVALID_CATALOG,
        INVALID_SCHEMA,
        "t",
        false,
    )
    .unwrap()
    .unwrap();
    assert!(lookup.catalog.version() > version_before);
}

#[test]
fn replace_swaps_payload_and_alter_on_conflict_merges() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    harness.create_table(&db1, DEFAULT_SCHEMA, "t");

    let txn = harness.begin();
    db1.create_table(&txn, &CreateTableInfo {
        base: CreateInfoBase::new("t")
            .with_schema(DEFAULT_SCHEMA)
            .with_on_conflict(OnCreateConflict::Replace),
        columns: vec![ColumnDefinition::new("renamed", LogicalType::Varchar)],
    })
    .unwrap();
    txn.commit().unwrap();

    let txn = harness.begin();
    let lookup = resolve::lookup_entry(
        &harness.ctx(),
        &txn,
        EntryKind::Table,
        INVALID_CATALOG,
        INVALID_SCHEMA,
        "t",
        false,
    )
    .unwrap()
    .unwrap();
    let EntryPayload::Table(table) = &lookup.entry.payload else {
        panic!("expected a table payload");
    };
    assert_eq!(table.columns.len(), 1);
    assert_eq!(table.columns[0].name, "renamed");
}

#[test]
fn alter_on_conflict_merges_function_overloads() {
    use quill_catalog::entry::{FunctionSignature, ScalarFunctionEntry};
    use quill_catalog::info::{CreateFunctionInfo, FunctionDescriptor};

    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    let info = |ty: LogicalType| CreateFunctionInfo {
        base: CreateInfoBase::new("shape")
            .with_schema(DEFAULT_SCHEMA)
            .with_on_conflict(OnCreateConflict::AlterOnConflict),
        function: FunctionDescriptor::Scalar(ScalarFunctionEntry::new(vec![
            FunctionSignature::new(vec![ty.clone()], ty),
        ])),
    };

    // Absent: behaves like a plain create.
    let txn = harness.begin();
    db1.create_function(&txn, &info(LogicalType::Int64)).unwrap();
    // Present: the new overload is merged in.
    let merged = db1
        .create_function(&txn, &info(LogicalType::Varchar))
        .unwrap();
    let EntryPayload::ScalarFunction(function) = &merged.payload else {
        panic!("expected a scalar function payload");
    };
    assert_eq!(function.overloads.len(), 2);
    txn.commit().unwrap();
}

#[test]
fn concurrent_create_of_same_name_serializes() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");

    let t1 = harness.begin();
    let t2 = harness.begin();
    let info = CreateTableInfo {
        base: CreateInfoBase::new("t").with_schema(DEFAULT_SCHEMA),
        columns: vec![],
    };
    db1.create_table(&t1, &info).unwrap();
    let err = db1.create_table(&t2, &info).unwrap_err();
    assert!(matches!(err, CatalogError::SerializationFailure { .. }));
    t1.commit().unwrap();
}

#[test]
fn interrupt_cancels_next_operation() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    let flag = Arc::new(AtomicBool::new(false));
    let txn = harness
        .manager
        .txn_manager()
        .begin_transaction_with(IsolationLevel::Snapshot, Some(flag.clone()))
        .unwrap();

    flag.store(true, Ordering::SeqCst);
    let err = db1
        .create_table(&txn, &CreateTableInfo {
            base: CreateInfoBase::new("t").with_schema(DEFAULT_SCHEMA),
            columns: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::Cancelled));
}

#[test]
fn rename_entry_through_alter() {
    let harness = Harness::new("db1");
    let db1 = harness.attach("db1");
    harness.create_table(&db1, DEFAULT_SCHEMA, "old_name");

    let txn = harness.begin();
    db1.alter(&txn, &AlterInfo::Rename {
        kind: EntryKind::Table,
        catalog: "db1".to_string(),
        schema: DEFAULT_SCHEMA.to_string(),
        name: "old_name".to_string(),
        new_name: "new_name".to_string(),
        if_exists: false,
    })
    .unwrap();
    txn.commit().unwrap();

    let txn = harness.begin();
    let ctx = harness.ctx();
    assert!(
        resolve::lookup_entry(
            &ctx,
            &txn,
            EntryKind::Table,
            INVALID_CATALOG,
            INVALID_SCHEMA,
            "old_name",
            true
        )
        .unwrap()
        .is_none()
    );
    assert!(
        resolve::lookup_entry(
            &ctx,
            &txn,
            EntryKind::Table,
            INVALID_CATALOG,
            INVALID_SCHEMA,
            "new_name",
            true
        )
        .unwrap()
        .is_some()
    );
}

#[test]
fn list_all_schemas_sorted_by_catalog_then_schema() {
    let harness = Harness::new("db1");
    let db2 = harness.attach("db2");
    harness.attach("db1");
    let txn = harness.begin();
    db2.create_schema(&txn, &CreateSchemaInfo {
        base: CreateInfoBase::new("aux"),
    })
    .unwrap();
    txn.commit().unwrap();

    let txn = harness.begin();
    let all = resolve::list_all_schemas(&harness.ctx(), &txn);
    let names: Vec<(String, String)> = all
        .iter()
        .map(|(catalog, schema)| (catalog.name().to_string(), schema.name().to_string()))
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&("db2".to_string(), "aux".to_string())));
}
