//! The root namespace of one attached database: a versioned schema
//! registry, a monotone version counter, and the typed DDL dispatch that
//! routes descriptors to the owning schema.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use quill_common::Transaction;
use quill_common::constants::{DEFAULT_SCHEMA, SYSTEM_CATALOG, TEMP_CATALOG};
use quill_common::data_type::LogicalType;
use quill_common::string::levenshtein;
use tracing::debug;

use crate::entry::{CatalogEntry, EntryKind, EntryOid, EntryPayload, next_oid};
use crate::entry_set::distance_threshold;
use crate::error::{CatalogError, CatalogResult};
use crate::info::{
    AlterInfo, CreateCollationInfo, CreateCopyFunctionInfo, CreateFunctionInfo, CreateIndexInfo,
    CreateMacroInfo, CreatePragmaFunctionInfo, CreateSchemaInfo, CreateSequenceInfo,
    CreateTableFunctionInfo, CreateTableInfo, CreateTypeInfo, CreateViewInfo, DropInfo,
    OnCreateConflict,
};
use crate::qualified::is_invalid_schema;
use crate::schema::SchemaEntry;
use crate::txn::catalog_txn::CatalogTxn;
use crate::txn::versioned::{VersionedMap, WriteOp};

/// A resolved user-defined type, carrying the defining entry so the planner
/// can compare type identity by oid.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub ty: LogicalType,
    pub entry: Arc<CatalogEntry>,
}

#[derive(Debug)]
pub struct Catalog {
    name: String,
    oid: EntryOid,
    schemas: Arc<VersionedMap<String, SchemaEntry>>,
    version: AtomicU64,
    is_system: bool,
    is_temporary: bool,
    read_only: bool,
    /// Set once the system catalog is fully populated; writes fail after.
    sealed: AtomicBool,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oid: next_oid(),
            schemas: Arc::new(VersionedMap::new()),
            version: AtomicU64::new(0),
            is_system: false,
            is_temporary: false,
            read_only: false,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn new_system() -> Self {
        let mut catalog = Self::new(SYSTEM_CATALOG);
        catalog.is_system = true;
        catalog
    }

    pub fn new_temporary() -> Self {
        let mut catalog = Self::new(TEMP_CATALOG);
        catalog.is_temporary = true;
        catalog
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn oid(&self) -> EntryOid {
        self.oid
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    #[inline]
    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Current catalog version; strictly greater after every successful
    /// mutation.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Bump and return the new version.
    #[inline]
    pub fn modify(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Freeze the catalog; used for the system catalog once built-ins are
    /// registered.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> CatalogResult<()> {
        if self.read_only || (self.is_system && self.sealed.load(Ordering::SeqCst)) {
            return Err(CatalogError::read_only_catalog(&self.name));
        }
        Ok(())
    }

    fn begin_mutation(&self, txn: &CatalogTxn) -> CatalogResult<()> {
        txn.check_interrupted()?;
        self.check_writable()?;
        self.modify();
        Ok(())
    }

    fn effective_schema<'a>(&self, schema: &'a str) -> &'a str {
        if is_invalid_schema(schema) {
            DEFAULT_SCHEMA
        } else {
            schema
        }
    }

    // ===== Schemas =====

    pub fn create_schema(
        &self,
        txn: &CatalogTxn,
        info: &CreateSchemaInfo,
    ) -> CatalogResult<Arc<SchemaEntry>> {
        self.begin_mutation(txn)?;
        let name = info.base.name.clone();
        if let Some(existing) = self.schemas.get(&name, txn) {
            return match info.base.on_conflict {
                OnCreateConflict::Error => Err(CatalogError::AlreadyExists {
                    kind: EntryKind::Schema,
                    name,
                }),
                OnCreateConflict::Ignore => Ok(existing),
                _ => Err(CatalogError::InvalidArgument {
                    reason: "schemas cannot be replaced in place".to_string(),
                }),
            };
        }
        debug!(catalog = %self.name, schema = %name, "create schema");
        let schema = Arc::new(SchemaEntry::from_info(&self.name, info));
        let node = self.schemas.put(name.clone(), schema.clone(), txn)?;
        txn.record_write(&self.schemas, name, node, WriteOp::Create);
        Ok(schema)
    }

    pub fn drop_schema(&self, txn: &CatalogTxn, info: &DropInfo) -> CatalogResult<bool> {
        self.begin_mutation(txn)?;
        let Some(schema) = self.schemas.get(&info.name, txn) else {
            if info.if_exists {
                return Ok(false);
            }
            return Err(self.schema_not_found(txn, &info.name));
        };
        if !info.cascade && !schema.is_empty(txn) {
            return Err(CatalogError::HasDependents {
                kind: EntryKind::Schema,
                name: info.name.clone(),
            });
        }
        // Tombstoning the schema takes its registries out of reach in one
        // atomic step at commit.
        debug!(catalog = %self.name, schema = %info.name, "drop schema");
        let key = info.name.clone();
        let node = self.schemas.delete(&key, txn)?;
        txn.record_write(&self.schemas, key, node, WriteOp::Delete);
        Ok(true)
    }

    /// Schema by name; an unspecified schema means `main`. With
    /// `if_exists`, absence is `Ok(None)`, otherwise an error carrying a
    /// closest-match hint.
    pub fn get_schema(
        &self,
        txn: &CatalogTxn,
        name: &str,
        if_exists: bool,
    ) -> CatalogResult<Option<Arc<SchemaEntry>>> {
        let name = self.effective_schema(name);
        if let Some(schema) = self.schemas.get(&name.to_string(), txn) {
            return Ok(Some(schema));
        }
        if if_exists {
            return Ok(None);
        }
        Err(self.schema_not_found(txn, name))
    }

    fn schema_not_found(&self, txn: &CatalogTxn, name: &str) -> CatalogError {
        let suggestion = self
            .similar_schema(txn, name)
            .map(|s| format!("\nDid you mean \"{s}\"?"))
            .unwrap_or_default();
        CatalogError::EntryNotFound {
            kind: EntryKind::Schema,
            name: name.to_string(),
            suggestion,
        }
    }

    fn similar_schema(&self, txn: &CatalogTxn, name: &str) -> Option<String> {
        let threshold = distance_threshold(name);
        let mut best: Option<(usize, String)> = None;
        for (candidate, _) in self.schemas.visible_entries(txn.start_ts(), txn.txn_id()) {
            let distance = levenshtein(&candidate, name);
            if distance > threshold {
                continue;
            }
            if best.as_ref().is_none_or(|(d, _)| distance < *d) {
                best = Some((distance, candidate));
            }
        }
        best.map(|(_, name)| name)
    }

    /// Visible schemas in creation order.
    pub fn schemas(&self, txn: &CatalogTxn) -> Vec<Arc<SchemaEntry>> {
        self.schemas
            .visible_entries(txn.start_ts(), txn.txn_id())
            .into_iter()
            .map(|(_, schema)| schema)
            .collect()
    }

    pub fn scan_schemas(&self, txn: &CatalogTxn, visitor: &mut dyn FnMut(&Arc<SchemaEntry>)) {
        for schema in self.schemas(txn) {
            visitor(&schema);
        }
    }

    fn rename_schema(
        &self,
        txn: &CatalogTxn,
        name: &str,
        new_name: &str,
        if_exists: bool,
    ) -> CatalogResult<bool> {
        let Some(schema) = self.schemas.get(&name.to_string(), txn) else {
            if if_exists {
                return Ok(false);
            }
            return Err(self.schema_not_found(txn, name));
        };
        if self.schemas.get(&new_name.to_string(), txn).is_some() {
            return Err(CatalogError::AlreadyExists {
                kind: EntryKind::Schema,
                name: new_name.to_string(),
            });
        }
        let key = name.to_string();
        let node = self.schemas.delete(&key, txn)?;
        txn.record_write(&self.schemas, key, node, WriteOp::Delete);

        let renamed = Arc::new(schema.renamed(new_name));
        let node = self.schemas.put(new_name.to_string(), renamed.clone(), txn)?;
        txn.record_write(&self.schemas, new_name.to_string(), node, WriteOp::Create);

        // Owned entries carry the schema name as their back-reference.
        renamed.rewrite_entries_for_rename(txn)?;
        Ok(true)
    }

    // ===== Typed entry operations =====

    fn schema_for(&self, txn: &CatalogTxn, schema: &str) -> CatalogResult<Arc<SchemaEntry>> {
        match self.get_schema(txn, schema, false)? {
            Some(schema) => Ok(schema),
            None => Err(self.schema_not_found(txn, schema)),
        }
    }

    pub fn create_table(
        &self,
        txn: &CatalogTxn,
        info: &CreateTableInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_table(txn, info)
    }

    pub fn create_view(
        &self,
        txn: &CatalogTxn,
        info: &CreateViewInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_view(txn, info)
    }

    pub fn create_sequence(
        &self,
        txn: &CatalogTxn,
        info: &CreateSequenceInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_sequence(txn, info)
    }

    pub fn create_type(
        &self,
        txn: &CatalogTxn,
        info: &CreateTypeInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_type(txn, info)
    }

    pub fn create_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_function(txn, info)
    }

    /// Re-registration path for built-ins: same as `create_function` but
    /// merging with any existing overloads.
    pub fn add_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let mut info = info.clone();
        info.base.on_conflict = OnCreateConflict::AlterOnConflict;
        self.create_function(txn, &info)
    }

    pub fn create_table_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateTableFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?
            .create_table_function(txn, info)
    }

    pub fn create_pragma_function(
        &self,
        txn: &CatalogTxn,
        info: &CreatePragmaFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?
            .create_pragma_function(txn, info)
    }

    pub fn create_copy_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateCopyFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?
            .create_copy_function(txn, info)
    }

    pub fn create_macro(
        &self,
        txn: &CatalogTxn,
        info: &CreateMacroInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_macro(txn, info)
    }

    pub fn create_collation(
        &self,
        txn: &CatalogTxn,
        info: &CreateCollationInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_collation(txn, info)
    }

    pub fn create_index(
        &self,
        txn: &CatalogTxn,
        info: &CreateIndexInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.begin_mutation(txn)?;
        self.schema_for(txn, &info.base.schema)?.create_index(txn, info)
    }

    /// Drop any entry kind, schemas included. Returns `false` when the
    /// target was absent and `if_exists` was set.
    pub fn drop_entry(&self, txn: &CatalogTxn, info: &DropInfo) -> CatalogResult<bool> {
        if info.kind == EntryKind::Schema {
            return self.drop_schema(txn, info);
        }
        self.begin_mutation(txn)?;
        let Some(schema) = self
            .get_schema(txn, &info.schema, info.if_exists)?
        else {
            return Ok(false);
        };
        schema.drop_entry(txn, info)
    }

    /// Apply a typed mutation. Returns `false` when the target was absent
    /// and `if_exists` was set.
    pub fn alter(&self, txn: &CatalogTxn, info: &AlterInfo) -> CatalogResult<bool> {
        self.begin_mutation(txn)?;
        if let AlterInfo::Rename {
            kind: EntryKind::Schema,
            name,
            new_name,
            if_exists,
            ..
        } = info
        {
            return self.rename_schema(txn, name, new_name, *if_exists);
        }
        let Some(schema) = self.get_schema(txn, info.schema(), info.if_exists())? else {
            return Ok(false);
        };
        schema.alter(txn, info)
    }

    /// Resolve a user-defined type, attaching the defining entry for type
    /// identity.
    pub fn get_type(
        &self,
        txn: &CatalogTxn,
        schema: &str,
        name: &str,
        if_exists: bool,
    ) -> CatalogResult<Option<TypeDescriptor>> {
        let Some(schema) = self.get_schema(txn, schema, if_exists)? else {
            return Ok(None);
        };
        let Some(entry) = schema.get_entry(txn, EntryKind::Type, name) else {
            if if_exists {
                return Ok(None);
            }
            return Err(CatalogError::not_found(EntryKind::Type, name));
        };
        let EntryPayload::Type(payload) = &entry.payload else {
            unreachable!("type registry only stores type entries");
        };
        Ok(Some(TypeDescriptor {
            ty: payload.ty.clone(),
            entry,
        }))
    }

    /// Untyped convenience lookup over the kinds a bare table name may
    /// refer to.
    pub fn get_entry_untyped(
        &self,
        txn: &CatalogTxn,
        schema: &str,
        name: &str,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        for kind in [EntryKind::Table, EntryKind::Sequence] {
            if let Some(schema_entry) = self.get_schema(txn, schema, true)?
                && let Some(entry) = schema_entry.get_entry(txn, kind, name)
            {
                return Ok(entry);
            }
        }
        Err(CatalogError::ElementNotFound {
            schema: self.effective_schema(schema).to_string(),
            name: name.to_string(),
        })
    }

    /// Probe one `(schema, entry)` pair. Returns the schema even on entry
    /// miss so callers can gather suggestion candidates.
    pub fn lookup_entry_internal(
        &self,
        txn: &CatalogTxn,
        kind: EntryKind,
        schema: &str,
        name: &str,
    ) -> CatalogResult<(Option<Arc<SchemaEntry>>, Option<Arc<CatalogEntry>>)> {
        let Some(schema_entry) = self.get_schema(txn, schema, true)? else {
            return Ok((None, None));
        };
        let entry = schema_entry.get_entry(txn, kind, name);
        Ok((Some(schema_entry), entry))
    }
}

#[cfg(test)]
mod tests {
    use quill_common::{IsolationLevel, Transaction};

    use super::*;
    use crate::info::CreateInfoBase;
    use crate::txn::manager::CatalogTxnManager;

    fn begin(mgr: &CatalogTxnManager) -> Arc<CatalogTxn> {
        mgr.begin_transaction(IsolationLevel::Snapshot).unwrap()
    }

    fn catalog_with_main(mgr: &CatalogTxnManager) -> Catalog {
        let catalog = Catalog::new("db");
        let txn = begin(mgr);
        catalog
            .create_schema(&txn, &CreateSchemaInfo {
                base: CreateInfoBase::new(DEFAULT_SCHEMA),
            })
            .unwrap();
        txn.commit().unwrap();
        catalog
    }

    #[test]
    fn version_strictly_increases_per_mutation() {
        let mgr = CatalogTxnManager::new();
        let catalog = catalog_with_main(&mgr);
        let before = catalog.version();
        let txn = begin(&mgr);
        catalog
            .create_table(&txn, &CreateTableInfo {
                base: CreateInfoBase::new("t"),
                columns: vec![],
            })
            .unwrap();
        txn.commit().unwrap();
        assert!(catalog.version() > before);
    }

    #[test]
    fn sealed_system_catalog_rejects_writes() {
        let mgr = CatalogTxnManager::new();
        let catalog = Catalog::new_system();
        let txn = begin(&mgr);
        catalog
            .create_schema(&txn, &CreateSchemaInfo {
                base: CreateInfoBase::new(DEFAULT_SCHEMA),
            })
            .unwrap();
        txn.commit().unwrap();
        catalog.seal();

        let txn = begin(&mgr);
        let err = catalog
            .create_table(&txn, &CreateTableInfo {
                base: CreateInfoBase::new("t"),
                columns: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
    }

    #[test]
    fn missing_schema_suggests_closest() {
        let mgr = CatalogTxnManager::new();
        let catalog = catalog_with_main(&mgr);
        let txn = begin(&mgr);
        let err = catalog.get_schema(&txn, "mian", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema with name mian does not exist!\nDid you mean \"main\"?"
        );
    }

    #[test]
    fn schema_rename_rewrites_entry_backrefs() {
        let mgr = CatalogTxnManager::new();
        let catalog = catalog_with_main(&mgr);
        let txn = begin(&mgr);
        catalog
            .create_table(&txn, &CreateTableInfo {
                base: CreateInfoBase::new("t"),
                columns: vec![],
            })
            .unwrap();
        txn.commit().unwrap();

        let txn = begin(&mgr);
        catalog
            .alter(&txn, &AlterInfo::Rename {
                kind: EntryKind::Schema,
                catalog: String::new(),
                schema: String::new(),
                name: DEFAULT_SCHEMA.to_string(),
                new_name: "archive".to_string(),
                if_exists: false,
            })
            .unwrap();
        txn.commit().unwrap();

        let txn = begin(&mgr);
        let schema = catalog.get_schema(&txn, "archive", false).unwrap().unwrap();
        let entry = schema.get_entry(&txn, EntryKind::Table, "t").unwrap();
        assert_eq!(entry.header.schema, "archive");
    }

    #[test]
    fn drop_schema_requires_cascade_when_populated() {
        let mgr = CatalogTxnManager::new();
        let catalog = catalog_with_main(&mgr);
        let txn = begin(&mgr);
        catalog
            .create_table(&txn, &CreateTableInfo {
                base: CreateInfoBase::new("t"),
                columns: vec![],
            })
            .unwrap();
        txn.commit().unwrap();

        let txn = begin(&mgr);
        let err = catalog
            .drop_schema(&txn, &DropInfo::new(EntryKind::Schema, DEFAULT_SCHEMA))
            .unwrap_err();
        assert!(matches!(err, CatalogError::HasDependents { .. }));

        catalog
            .drop_schema(
                &txn,
                &DropInfo::new(EntryKind::Schema, DEFAULT_SCHEMA).cascade(),
            )
            .unwrap();
        txn.commit().unwrap();

        let txn = begin(&mgr);
        assert!(catalog.get_schema(&txn, DEFAULT_SCHEMA, true).unwrap().is_none());
    }
}
