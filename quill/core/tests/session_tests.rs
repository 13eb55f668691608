use quill_catalog::entry::{ColumnDefinition, EntryKind};
use quill_catalog::error::CatalogError;
use quill_catalog::info::{CreateInfoBase, CreateSchemaInfo, CreateTableInfo, DropInfo};
use quill_catalog::search_path::CatalogSearchEntry;
use quill_common::data_type::LogicalType;
use quill_core::{AttachOptions, Database, DatabaseConfig, Error};

fn open() -> Database {
    Database::open_in_memory(&DatabaseConfig::default()).unwrap()
}

fn table_info(name: &str) -> CreateTableInfo {
    CreateTableInfo {
        base: CreateInfoBase::new(name),
        columns: vec![ColumnDefinition::new("id", LogicalType::Int64)],
    }
}

#[test]
fn builtin_functions_resolve_through_system_catalog() {
    let db = open();
    let mut session = db.session().unwrap();

    let abs = session
        .resolve_entry(EntryKind::ScalarFunction, None, None, "abs", false)
        .unwrap()
        .unwrap();
    assert_eq!(abs.name(), "abs");
    assert_eq!(abs.header.catalog, "system");

    assert!(
        session
            .resolve_entry(EntryKind::AggregateFunction, None, None, "sum", true)
            .unwrap()
            .is_some()
    );
    assert!(
        session
            .resolve_entry(EntryKind::TableFunction, None, None, "read_csv", true)
            .unwrap()
            .is_some()
    );
    assert!(
        session
            .resolve_entry(EntryKind::PragmaFunction, None, None, "table_info", true)
            .unwrap()
            .is_some()
    );
}

#[test]
fn create_and_resolve_in_default_database() {
    let db = open();
    let mut session = db.session().unwrap();

    session.create_table(&table_info("events")).unwrap();
    let entry = session
        .resolve_entry(EntryKind::Table, None, None, "events", false)
        .unwrap()
        .unwrap();
    assert_eq!(entry.header.catalog, "memory");
    assert_eq!(entry.header.schema, "main");

    // Same name under a different kind is a separate namespace.
    session
        .create_sequence(&quill_catalog::info::CreateSequenceInfo {
            base: CreateInfoBase::new("events"),
            sequence: Default::default(),
        })
        .unwrap();
    assert!(
        session
            .resolve_entry(EntryKind::Sequence, None, None, "events", true)
            .unwrap()
            .is_some()
    );
}

#[test]
fn create_drop_get_roundtrip() {
    let db = open();
    let mut session = db.session().unwrap();

    session.create_table(&table_info("t")).unwrap();
    assert!(session.drop(&DropInfo::new(EntryKind::Table, "t")).unwrap());
    assert!(
        session
            .resolve_entry(EntryKind::Table, None, None, "t", true)
            .unwrap()
            .is_none()
    );
}

#[test]
fn temporary_objects_shadow_and_stay_session_local() {
    let db = open();
    let mut s1 = db.session().unwrap();
    let mut s2 = db.session().unwrap();

    let mut info = table_info("scratch");
    info.base.catalog = "temp".to_string();
    info.base.temporary = true;
    s1.create_table(&info).unwrap();

    // Unqualified resolution hits the temp catalog first.
    let entry = s1
        .resolve_entry(EntryKind::Table, None, None, "scratch", false)
        .unwrap()
        .unwrap();
    assert_eq!(entry.header.catalog, "temp");

    // Another session has its own temp catalog.
    assert!(
        s2.resolve_entry(EntryKind::Table, None, None, "scratch", true)
            .unwrap()
            .is_none()
    );
}

#[test]
fn attach_detach_and_cross_catalog_resolution() {
    let db = open();
    let mut session = db.session().unwrap();

    session.attach("db2", AttachOptions::default()).unwrap();
    let mut info = table_info("remote");
    info.base.catalog = "db2".to_string();
    session.create_table(&info).unwrap();

    // Not on the search path: only a qualified lookup finds it.
    assert!(
        session
            .resolve_entry(EntryKind::Table, None, None, "remote", true)
            .unwrap()
            .is_none()
    );
    assert!(
        session
            .resolve_entry(EntryKind::Table, Some("db2"), None, "remote", true)
            .unwrap()
            .is_some()
    );

    // Put it on the path and the bare name resolves.
    session.set_search_path_str("main, db2.main").unwrap();
    assert!(
        session
            .resolve_entry(EntryKind::Table, None, None, "remote", true)
            .unwrap()
            .is_some()
    );

    session.detach("db2").unwrap();
    let err = session.get_catalog_or_fail("db2").unwrap_err();
    assert_eq!(err.to_string(), "Catalog \"db2\" does not exist!");
}

#[test]
fn read_only_attach_rejects_ddl() {
    let db = open();
    let mut session = db.session().unwrap();
    session
        .attach("frozen", AttachOptions { read_only: true })
        .unwrap();

    let mut info = table_info("t");
    info.base.catalog = "frozen".to_string();
    let err = session.create_table(&info).unwrap_err();
    assert!(matches!(
        err,
        Error::Catalog(CatalogError::PermissionDenied { .. })
    ));
}

#[test]
fn search_path_roundtrips_and_hides_implicit_entries() {
    let db = open();
    let mut session = db.session().unwrap();
    session.attach("db2", AttachOptions::default()).unwrap();

    let entries = vec![
        CatalogSearchEntry::schema_only("main"),
        CatalogSearchEntry::new("db2", "main"),
    ];
    session.set_search_path(entries.clone()).unwrap();
    assert_eq!(session.get_search_path(), entries);

    let err = session.set_search_path(vec![]).unwrap_err();
    assert!(matches!(
        err,
        Error::Catalog(CatalogError::InvalidArgument { .. })
    ));
}

#[test]
fn explicit_transaction_scopes_visibility() {
    let db = open();
    let mut s1 = db.session().unwrap();
    let mut s2 = db.session().unwrap();

    s1.begin_transaction().unwrap();
    s1.create_table(&table_info("pending")).unwrap();

    // Uncommitted work is invisible to the other session.
    assert!(
        s2.resolve_entry(EntryKind::Table, None, None, "pending", true)
            .unwrap()
            .is_none()
    );

    s1.commit().unwrap();
    assert!(
        s2.resolve_entry(EntryKind::Table, None, None, "pending", true)
            .unwrap()
            .is_some()
    );
}

#[test]
fn rollback_discards_ddl() {
    let db = open();
    let mut session = db.session().unwrap();

    session.begin_transaction().unwrap();
    session.create_table(&table_info("ghost")).unwrap();
    session.rollback().unwrap();

    assert!(
        session
            .resolve_entry(EntryKind::Table, None, None, "ghost", true)
            .unwrap()
            .is_none()
    );
}

#[test]
fn drop_resolves_owning_schema_through_path() {
    let db = open();
    let mut session = db.session().unwrap();
    session
        .create_schema(&CreateSchemaInfo {
            base: CreateInfoBase::new("aux"),
        })
        .unwrap();
    let mut info = table_info("t");
    info.base.schema = "aux".to_string();
    session.create_table(&info).unwrap();
    session.set_search_path_str("main, aux").unwrap();

    // No schema qualifier: the search path locates `aux.t`.
    assert!(session.drop(&DropInfo::new(EntryKind::Table, "t")).unwrap());
    assert!(
        session
            .resolve_entry(EntryKind::Table, None, Some("aux"), "t", true)
            .unwrap()
            .is_none()
    );
}

#[test]
fn unknown_setting_diagnostics() {
    let db = open();
    let session = db.session().unwrap();

    assert!(session.validate_configuration_parameter("threads").is_ok());

    let err = session
        .validate_configuration_parameter("s3_region")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Setting with name \"s3_region\" is not in the catalog, but it exists in the httpfs extension.\n\nTo install and load the extension, run:\nINSTALL httpfs;\nLOAD httpfs;"
    );

    let err = session
        .validate_configuration_parameter("tread")
        .unwrap_err();
    assert!(
        err.to_string()
            .starts_with("unrecognized configuration parameter \"tread\"")
    );
}

#[test]
fn interrupt_cancels_next_statement() {
    let db = open();
    let mut session = db.session().unwrap();
    session.interrupt();
    let err = session.create_table(&table_info("t")).unwrap_err();
    assert!(matches!(err, Error::Catalog(CatalogError::Cancelled)));
}

#[test]
fn list_all_schemas_is_sorted() {
    let db = open();
    let mut session = db.session().unwrap();
    session.attach("alpha", AttachOptions::default()).unwrap();

    let schemas = session.list_all_schemas().unwrap();
    let keys: Vec<(String, String)> = schemas
        .iter()
        .map(|s| (s.catalog_name().to_string(), s.name().to_string()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(keys.contains(&("alpha".to_string(), "main".to_string())));
    assert!(keys.contains(&("system".to_string(), "main".to_string())));
}
