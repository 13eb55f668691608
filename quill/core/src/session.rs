use std::sync::Arc;

use quill_catalog::catalog::{Catalog, TypeDescriptor};
use quill_catalog::entry::{CatalogEntry, EntryKind, EntryPayload};
use quill_catalog::error::CatalogResult;
use quill_catalog::info::{
    AlterInfo, CreateCollationInfo, CreateCopyFunctionInfo, CreateFunctionInfo, CreateIndexInfo,
    CreateMacroInfo, CreatePragmaFunctionInfo, CreateSchemaInfo, CreateSequenceInfo,
    CreateTableFunctionInfo, CreateTableInfo, CreateTypeInfo, CreateViewInfo, DropInfo,
    OnCreateConflict,
};
use quill_catalog::resolve::{self, CatalogEntryLookup, ResolveContext};
use quill_catalog::schema::SchemaEntry;
use quill_catalog::search_path::CatalogSearchEntry;
use quill_catalog::settings::unrecognized_configuration_error;
use quill_catalog::txn::catalog_txn::CatalogTxn;
use quill_common::constants::{INVALID_CATALOG, INVALID_SCHEMA, SYSTEM_CATALOG};
use quill_common::{IsolationLevel, Transaction};
use quill_context::database::DatabaseContext;
use quill_context::session::SessionContext;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    pub read_only: bool,
}

/// One client session: the programmatic surface the binder and planner
/// talk to. Statements run under the session's explicit transaction when
/// one is open, otherwise each call auto-commits.
pub struct Session {
    context: SessionContext,
    closed: bool,
}

impl Session {
    pub(crate) fn new(
        database: Arc<DatabaseContext>,
        default_database: String,
    ) -> Result<Self> {
        let context = SessionContext::new(database, default_database)?;
        Ok(Self {
            context,
            closed: false,
        })
    }

    #[inline]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn close(&mut self) {
        if let Some(_txn) = self.context.current_txn() {
            let _ = self.context.rollback_explicit_txn();
        }
        self.closed = true;
    }

    fn run<T>(
        &mut self,
        f: impl FnOnce(&ResolveContext<'_>, &CatalogTxn) -> CatalogResult<T>,
    ) -> Result<T> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(self.context.with_statement_txn(f)?)
    }

    // ===== Transactions =====

    pub fn begin_transaction(&mut self) -> Result<()> {
        Ok(self.context.begin_explicit_txn()?)
    }

    pub fn commit(&mut self) -> Result<()> {
        Ok(self.context.commit_explicit_txn()?)
    }

    pub fn rollback(&mut self) -> Result<()> {
        Ok(self.context.rollback_explicit_txn()?)
    }

    pub fn set_isolation_level(&mut self, iso: IsolationLevel) {
        self.context.set_default_isolation(iso);
    }

    /// Cancel in-flight work; the next catalog operation fails.
    pub fn interrupt(&self) {
        self.context.interrupt();
    }

    // ===== Catalog access =====

    pub fn get_catalog(&self, name: &str) -> Option<Arc<Catalog>> {
        self.context.resolve_ctx().get_catalog(name)
    }

    pub fn get_catalog_or_fail(&self, name: &str) -> Result<Arc<Catalog>> {
        Ok(self.context.resolve_ctx().get_catalog_or_fail(name)?)
    }

    pub fn attach(&mut self, name: &str, options: AttachOptions) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let manager = self.context.database().manager().clone();
        let catalog = Arc::new(Catalog::new(name).with_read_only(options.read_only));
        let txn = manager
            .txn_manager()
            .begin_transaction(IsolationLevel::Snapshot)?;
        catalog.create_schema(&txn, &CreateSchemaInfo {
            base: quill_catalog::info::CreateInfoBase::new(
                quill_common::constants::DEFAULT_SCHEMA,
            ),
        })?;
        txn.commit().map_err(quill_catalog::CatalogError::from)?;
        manager.attach(catalog)?;
        debug!(database = %name, "attached");
        Ok(())
    }

    pub fn detach(&mut self, name: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(self.context.database().manager().detach(name)?)
    }

    pub fn default_database(&self) -> &str {
        self.context.default_database()
    }

    pub fn set_default_database(&mut self, name: &str) -> Result<()> {
        Ok(self.context.set_default_database(name)?)
    }

    // ===== Name resolution =====

    /// Resolve an entry through the search path. `catalog`/`schema` are
    /// optional qualifiers.
    pub fn resolve_entry(
        &mut self,
        kind: EntryKind,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
        if_exists: bool,
    ) -> Result<Option<Arc<CatalogEntry>>> {
        let catalog = catalog.unwrap_or(INVALID_CATALOG).to_string();
        let schema = schema.unwrap_or(INVALID_SCHEMA).to_string();
        let name = name.to_string();
        self.run(move |ctx, txn| {
            Ok(
                resolve::lookup_entry(ctx, txn, kind, &catalog, &schema, &name, if_exists)?
                    .map(|lookup| lookup.entry),
            )
        })
    }

    /// Resolve a parsed three-part name; unspecified parts carry the
    /// sentinel values.
    pub fn resolve_qualified(
        &mut self,
        kind: EntryKind,
        name: &quill_catalog::qualified::QualifiedName,
        if_exists: bool,
    ) -> Result<Option<Arc<CatalogEntry>>> {
        let catalog = name.catalog.clone();
        let schema = name.schema.clone();
        let entry = name.name.clone();
        self.run(move |ctx, txn| {
            Ok(
                resolve::lookup_entry(ctx, txn, kind, &catalog, &schema, &entry, if_exists)?
                    .map(|lookup| lookup.entry),
            )
        })
    }

    pub fn resolve_schema(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        if_exists: bool,
    ) -> Result<Option<Arc<SchemaEntry>>> {
        let catalog = catalog.unwrap_or(INVALID_CATALOG).to_string();
        let schema = schema.to_string();
        self.run(move |ctx, txn| {
            Ok(resolve::resolve_schema(ctx, txn, &catalog, &schema, if_exists)?
                .map(|(_, schema)| schema))
        })
    }

    /// Schemas of one catalog, or of the catalogs on the search path.
    pub fn list_schemas(&mut self, catalog: Option<&str>) -> Result<Vec<Arc<SchemaEntry>>> {
        let catalog = catalog.unwrap_or(INVALID_CATALOG).to_string();
        self.run(move |ctx, txn| {
            Ok(resolve::list_schemas(ctx, txn, &catalog)?
                .into_iter()
                .map(|(_, schema)| schema)
                .collect())
        })
    }

    /// Every schema of every reachable catalog, sorted by
    /// `(catalog_name, schema_name)`.
    pub fn list_all_schemas(&mut self) -> Result<Vec<Arc<SchemaEntry>>> {
        self.run(|ctx, txn| {
            Ok(resolve::list_all_schemas(ctx, txn)
                .into_iter()
                .map(|(_, schema)| schema)
                .collect())
        })
    }

    /// Resolve a user-defined type with its defining entry attached.
    pub fn get_type(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
        if_exists: bool,
    ) -> Result<Option<TypeDescriptor>> {
        let entry = self.resolve_entry(EntryKind::Type, catalog, schema, name, if_exists)?;
        Ok(entry.map(|entry| {
            let EntryPayload::Type(payload) = &entry.payload else {
                unreachable!("type lookups return type entries");
            };
            TypeDescriptor {
                ty: payload.ty.clone(),
                entry,
            }
        }))
    }

    /// Whether a type of this name exists, falling back to the system
    /// catalog.
    pub fn type_exists(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        if self
            .resolve_entry(EntryKind::Type, catalog, schema, name, true)?
            .is_some()
        {
            return Ok(true);
        }
        Ok(self
            .resolve_entry(EntryKind::Type, Some(SYSTEM_CATALOG), schema, name, true)?
            .is_some())
    }

    // ===== Search path =====

    pub fn set_search_path(&mut self, entries: Vec<CatalogSearchEntry>) -> Result<()> {
        Ok(self.context.set_search_path(entries)?)
    }

    /// Parse and set `schema` / `catalog.schema` entries from a
    /// comma-separated list.
    pub fn set_search_path_str(&mut self, input: &str) -> Result<()> {
        let entries = CatalogSearchEntry::parse_list(input)?;
        Ok(self.context.set_search_path(entries)?)
    }

    pub fn get_search_path(&self) -> Vec<CatalogSearchEntry> {
        self.context.search_path().get().to_vec()
    }

    // ===== DDL =====

    pub fn create_schema(&mut self, info: &CreateSchemaInfo) -> Result<Arc<SchemaEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_schema(txn, &info)
        })
    }

    pub fn create_table(&mut self, info: &CreateTableInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_table(txn, &info)
        })
    }

    pub fn create_view(&mut self, info: &CreateViewInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_view(txn, &info)
        })
    }

    pub fn create_sequence(&mut self, info: &CreateSequenceInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_sequence(txn, &info)
        })
    }

    pub fn create_type(&mut self, info: &CreateTypeInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_type(txn, &info)
        })
    }

    pub fn create_function(&mut self, info: &CreateFunctionInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_function(txn, &info)
        })
    }

    /// Create-or-merge path used to (re)register function overloads.
    pub fn add_function(&mut self, info: &CreateFunctionInfo) -> Result<Arc<CatalogEntry>> {
        let mut info = info.clone();
        info.base.on_conflict = OnCreateConflict::AlterOnConflict;
        self.create_function(&info)
    }

    pub fn create_table_function(
        &mut self,
        info: &CreateTableFunctionInfo,
    ) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_table_function(txn, &info)
        })
    }

    pub fn create_pragma_function(
        &mut self,
        info: &CreatePragmaFunctionInfo,
    ) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_pragma_function(txn, &info)
        })
    }

    pub fn create_copy_function(
        &mut self,
        info: &CreateCopyFunctionInfo,
    ) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_copy_function(txn, &info)
        })
    }

    pub fn create_macro(&mut self, info: &CreateMacroInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_macro(txn, &info)
        })
    }

    pub fn create_collation(&mut self, info: &CreateCollationInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_collation(txn, &info)
        })
    }

    pub fn create_index(&mut self, info: &CreateIndexInfo) -> Result<Arc<CatalogEntry>> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            ctx.get_catalog_or_fail(&info.base.catalog)?
                .create_index(txn, &info)
        })
    }

    /// Drop any entry kind. The owning schema is resolved through the
    /// search path when unspecified. Returns `false` when the target was
    /// absent and `if_exists` was set.
    pub fn drop(&mut self, info: &DropInfo) -> Result<bool> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            let catalog = ctx.get_catalog_or_fail(&info.catalog)?;
            if info.kind == EntryKind::Schema {
                return catalog.drop_entry(txn, &info);
            }
            let Some(lookup) = resolve::lookup_entry_in_catalog(
                ctx,
                txn,
                &catalog,
                info.kind,
                &info.schema,
                &info.name,
                info.if_exists,
            )?
            else {
                return Ok(false);
            };
            let mut concrete = info.clone();
            concrete.schema = lookup.schema.name().to_string();
            catalog.drop_entry(txn, &concrete)
        })
    }

    /// Apply a typed mutation, resolving the owning schema like `drop`.
    pub fn alter(&mut self, info: &AlterInfo) -> Result<bool> {
        let info = info.clone();
        self.run(move |ctx, txn| {
            let catalog = ctx.get_catalog_or_fail(info.catalog())?;
            if info.kind() == EntryKind::Schema {
                return catalog.alter(txn, &info);
            }
            let Some(lookup) = resolve::lookup_entry_in_catalog(
                ctx,
                txn,
                &catalog,
                info.kind(),
                info.schema(),
                info.name(),
                info.if_exists(),
            )?
            else {
                return Ok(false);
            };
            let concrete = with_schema(&info, lookup.schema.name());
            catalog.alter(txn, &concrete)
        })
    }

    /// Resolve an entry and report where it was found.
    pub fn lookup_entry(
        &mut self,
        kind: EntryKind,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
        if_exists: bool,
    ) -> Result<Option<CatalogEntryLookup>> {
        let catalog = catalog.unwrap_or(INVALID_CATALOG).to_string();
        let schema = schema.unwrap_or(INVALID_SCHEMA).to_string();
        let name = name.to_string();
        self.run(move |ctx, txn| {
            resolve::lookup_entry(ctx, txn, kind, &catalog, &schema, &name, if_exists)
        })
    }

    // ===== Settings =====

    /// Fail with the unrecognized-parameter diagnostic unless the name is
    /// a built-in or extension-registered option.
    pub fn validate_configuration_parameter(&self, name: &str) -> Result<()> {
        let settings = self.context.database().manager().settings();
        if settings.is_known(name) {
            return Ok(());
        }
        Err(Error::Catalog(unrecognized_configuration_error(
            settings, name,
        )))
    }
}

fn with_schema(info: &AlterInfo, schema_name: &str) -> AlterInfo {
    let mut info = info.clone();
    match &mut info {
        AlterInfo::Rename { schema, .. }
        | AlterInfo::AddColumn { schema, .. }
        | AlterInfo::SetDefault { schema, .. } => {
            *schema = schema_name.to_string();
        }
    }
    info
}
