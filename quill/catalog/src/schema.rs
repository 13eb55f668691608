//! A schema: one entry registry per kind, plus the dispatch that turns
//! typed create/drop/alter descriptors into registry operations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::entry::{
    AggregateFunctionEntry, CatalogEntry, CollationEntry, CopyFunctionEntry, EntryHeader,
    EntryKind, EntryOid, EntryOps, EntryPayload, IndexEntry, MacroEntry, PragmaFunctionEntry,
    ScalarFunctionEntry, TableEntry, TableFunctionEntry, TypeEntry, ViewEntry,
};
use crate::entry_set::{EntrySet, SimilarMatch};
use crate::error::{CatalogError, CatalogResult};
use crate::info::{
    AlterInfo, CreateCollationInfo, CreateCopyFunctionInfo, CreateFunctionInfo, CreateIndexInfo,
    CreateInfoBase, CreateMacroInfo, CreatePragmaFunctionInfo, CreateSchemaInfo,
    CreateSequenceInfo, CreateTableFunctionInfo, CreateTableInfo, CreateTypeInfo, CreateViewInfo,
    DropInfo, FunctionDescriptor, OnCreateConflict,
};
use crate::txn::catalog_txn::CatalogTxn;

/// A named bucket of entries inside a catalog. Registries are shared by
/// `Arc`, so a renamed schema is a new value over the same registries.
#[derive(Debug)]
pub struct SchemaEntry {
    header: EntryHeader,
    tables: Arc<EntrySet>,
    views: Arc<EntrySet>,
    sequences: Arc<EntrySet>,
    user_types: Arc<EntrySet>,
    scalar_functions: Arc<EntrySet>,
    aggregate_functions: Arc<EntrySet>,
    table_functions: Arc<EntrySet>,
    pragma_functions: Arc<EntrySet>,
    copy_functions: Arc<EntrySet>,
    macros: Arc<EntrySet>,
    collations: Arc<EntrySet>,
    indexes: Arc<EntrySet>,
}

impl SchemaEntry {
    pub fn new(catalog: impl Into<String>, name: impl Into<String>) -> Self {
        let catalog = catalog.into();
        let name = name.into();
        Self {
            header: EntryHeader::new(name.clone(), catalog, name),
            tables: Arc::new(EntrySet::new(EntryKind::Table)),
            views: Arc::new(EntrySet::new(EntryKind::View)),
            sequences: Arc::new(EntrySet::new(EntryKind::Sequence)),
            user_types: Arc::new(EntrySet::new(EntryKind::Type)),
            scalar_functions: Arc::new(EntrySet::new(EntryKind::ScalarFunction)),
            aggregate_functions: Arc::new(EntrySet::new(EntryKind::AggregateFunction)),
            table_functions: Arc::new(EntrySet::new(EntryKind::TableFunction)),
            pragma_functions: Arc::new(EntrySet::new(EntryKind::PragmaFunction)),
            copy_functions: Arc::new(EntrySet::new(EntryKind::CopyFunction)),
            macros: Arc::new(EntrySet::new(EntryKind::Macro)),
            collations: Arc::new(EntrySet::new(EntryKind::Collation)),
            indexes: Arc::new(EntrySet::new(EntryKind::Index)),
        }
    }

    pub fn from_info(catalog: &str, info: &CreateSchemaInfo) -> Self {
        Self::new(catalog, info.base.name.clone())
    }

    /// New value under a different name, sharing every registry.
    pub(crate) fn renamed(&self, new_name: &str) -> SchemaEntry {
        let mut header = self.header.clone();
        header.name = new_name.to_string();
        header.schema = new_name.to_string();
        SchemaEntry {
            header,
            tables: self.tables.clone(),
            views: self.views.clone(),
            sequences: self.sequences.clone(),
            user_types: self.user_types.clone(),
            scalar_functions: self.scalar_functions.clone(),
            aggregate_functions: self.aggregate_functions.clone(),
            table_functions: self.table_functions.clone(),
            pragma_functions: self.pragma_functions.clone(),
            copy_functions: self.copy_functions.clone(),
            macros: self.macros.clone(),
            collations: self.collations.clone(),
            indexes: self.indexes.clone(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    #[inline]
    pub fn oid(&self) -> EntryOid {
        self.header.oid
    }

    #[inline]
    pub fn catalog_name(&self) -> &str {
        &self.header.catalog
    }

    /// Registry for one entry kind; `Schema` itself has no registry here.
    pub fn entry_set(&self, kind: EntryKind) -> CatalogResult<&Arc<EntrySet>> {
        let set = match kind {
            EntryKind::Table => &self.tables,
            EntryKind::View => &self.views,
            EntryKind::Sequence => &self.sequences,
            EntryKind::Type => &self.user_types,
            EntryKind::ScalarFunction => &self.scalar_functions,
            EntryKind::AggregateFunction => &self.aggregate_functions,
            EntryKind::TableFunction => &self.table_functions,
            EntryKind::PragmaFunction => &self.pragma_functions,
            EntryKind::CopyFunction => &self.copy_functions,
            EntryKind::Macro => &self.macros,
            EntryKind::Collation => &self.collations,
            EntryKind::Index => &self.indexes,
            EntryKind::Schema => {
                return Err(CatalogError::InvalidArgument {
                    reason: "schemas are not stored inside schemas".to_string(),
                });
            }
        };
        Ok(set)
    }

    fn all_sets(&self) -> [&Arc<EntrySet>; 12] {
        [
            &self.tables,
            &self.views,
            &self.sequences,
            &self.user_types,
            &self.scalar_functions,
            &self.aggregate_functions,
            &self.table_functions,
            &self.pragma_functions,
            &self.copy_functions,
            &self.macros,
            &self.collations,
            &self.indexes,
        ]
    }

    pub fn get_entry(&self, txn: &CatalogTxn, kind: EntryKind, name: &str) -> Option<Arc<CatalogEntry>> {
        self.entry_set(kind).ok()?.get(txn, name)
    }

    pub fn is_empty(&self, txn: &CatalogTxn) -> bool {
        self.all_sets().iter().all(|set| set.is_empty(txn))
    }

    fn header_for(&self, base: &CreateInfoBase) -> EntryHeader {
        let mut header = EntryHeader::new(base.name.clone(), self.catalog_name(), self.name());
        header.temporary = base.temporary;
        header.internal = base.internal;
        header
    }

    // ===== Typed create operations =====

    pub fn create_table(
        &self,
        txn: &CatalogTxn,
        info: &CreateTableInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Table(TableEntry::new(info.columns.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_view(
        &self,
        txn: &CatalogTxn,
        info: &CreateViewInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let mut view = ViewEntry::new(info.sql.clone());
        view.column_aliases = info.column_aliases.clone();
        let entry = CatalogEntry::new(self.header_for(&info.base), EntryPayload::View(view));
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_sequence(
        &self,
        txn: &CatalogTxn,
        info: &CreateSequenceInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Sequence(info.sequence.clone()),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_type(
        &self,
        txn: &CatalogTxn,
        info: &CreateTypeInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Type(TypeEntry::new(info.ty.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let payload = match &info.function {
            FunctionDescriptor::Scalar(f) => {
                EntryPayload::ScalarFunction(ScalarFunctionEntry::new(f.overloads.clone()))
            }
            FunctionDescriptor::Aggregate(f) => {
                EntryPayload::AggregateFunction(AggregateFunctionEntry::new(f.overloads.clone()))
            }
        };
        let entry = CatalogEntry::new(self.header_for(&info.base), payload);
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_table_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateTableFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::TableFunction(TableFunctionEntry::new(info.overloads.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_pragma_function(
        &self,
        txn: &CatalogTxn,
        info: &CreatePragmaFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::PragmaFunction(PragmaFunctionEntry::new(info.parameters.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_copy_function(
        &self,
        txn: &CatalogTxn,
        info: &CreateCopyFunctionInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::CopyFunction(CopyFunctionEntry::new(info.format.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_macro(
        &self,
        txn: &CatalogTxn,
        info: &CreateMacroInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Macro(MacroEntry::new(info.overloads.clone())),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    pub fn create_collation(
        &self,
        txn: &CatalogTxn,
        info: &CreateCollationInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Collation(CollationEntry::new(info.function.clone(), info.combinable)),
        );
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    /// The indexed table is resolved in this schema and recorded as a
    /// dependency, so the table cannot be dropped underneath the index.
    pub fn create_index(
        &self,
        txn: &CatalogTxn,
        info: &CreateIndexInfo,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let Some(table) = self.tables.get(txn, &info.table) else {
            return Err(CatalogError::not_found(EntryKind::Table, &info.table));
        };
        let entry = CatalogEntry::new(
            self.header_for(&info.base),
            EntryPayload::Index(IndexEntry {
                table: table.oid(),
                column_ids: info.column_ids.clone(),
                unique: info.unique,
                sql: info.sql.clone(),
            }),
        )
        .with_dependency(table.oid());
        self.create_entry(txn, entry, info.base.on_conflict)
    }

    fn create_entry(
        &self,
        txn: &CatalogTxn,
        entry: CatalogEntry,
        on_conflict: OnCreateConflict,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        self.check_dependency_cycle(txn, &entry)?;
        self.entry_set(entry.kind())?.create(txn, entry, on_conflict)
    }

    // ===== Drop / alter =====

    /// Drop one entry. Returns `false` when the entry was absent and
    /// `if_exists` was set.
    pub fn drop_entry(&self, txn: &CatalogTxn, info: &DropInfo) -> CatalogResult<bool> {
        let set = self.entry_set(info.kind)?;
        let Some(target) = set.get(txn, &info.name) else {
            if info.if_exists {
                return Ok(false);
            }
            return Err(CatalogError::not_found(info.kind, &info.name));
        };
        if target.header.internal {
            return Err(CatalogError::protected_entry(info.kind, &info.name));
        }
        let dependents = self.dependents_of(txn, target.oid());
        if !dependents.is_empty() {
            if !info.cascade {
                return Err(CatalogError::HasDependents {
                    kind: info.kind,
                    name: info.name.clone(),
                });
            }
            for (kind, name) in dependents {
                let drop = DropInfo {
                    kind,
                    catalog: info.catalog.clone(),
                    schema: info.schema.clone(),
                    name,
                    if_exists: true,
                    cascade: true,
                };
                self.drop_entry(txn, &drop)?;
            }
        }
        set.drop_entry(txn, &info.name, false)?;
        Ok(true)
    }

    /// Apply a typed mutation. Returns `false` when the target was absent
    /// and `if_exists` was set.
    pub fn alter(&self, txn: &CatalogTxn, info: &AlterInfo) -> CatalogResult<bool> {
        match info {
            AlterInfo::Rename {
                kind,
                name,
                new_name,
                if_exists,
                ..
            } => {
                let set = self.entry_set(*kind)?;
                if set.get(txn, name).is_none() {
                    if *if_exists {
                        return Ok(false);
                    }
                    return Err(CatalogError::not_found(*kind, name));
                }
                set.rename(txn, name, new_name)?;
                Ok(true)
            }
            AlterInfo::AddColumn {
                table,
                column,
                if_exists,
                ..
            } => self.alter_table(txn, table, *if_exists, |t| {
                t.with_column(column.clone()).ok_or_else(|| {
                    CatalogError::InvalidArgument {
                        reason: format!("column \"{}\" already exists", column.name),
                    }
                })
            }),
            AlterInfo::SetDefault {
                table,
                column,
                default_value,
                if_exists,
                ..
            } => self.alter_table(txn, table, *if_exists, |t| {
                t.with_default(column, default_value.clone()).ok_or_else(|| {
                    CatalogError::InvalidArgument {
                        reason: format!("table has no column \"{column}\""),
                    }
                })
            }),
        }
    }

    fn alter_table(
        &self,
        txn: &CatalogTxn,
        table: &str,
        if_exists: bool,
        mutate: impl FnOnce(&TableEntry) -> CatalogResult<TableEntry>,
    ) -> CatalogResult<bool> {
        let Some(existing) = self.tables.get(txn, table) else {
            if if_exists {
                return Ok(false);
            }
            return Err(CatalogError::not_found(EntryKind::Table, table));
        };
        let EntryPayload::Table(payload) = &existing.payload else {
            return Err(CatalogError::TypeMismatch {
                name: table.to_string(),
                existing: existing.kind(),
                requested: EntryKind::Table,
            });
        };
        let mut entry = (*existing).clone();
        entry.payload = EntryPayload::Table(mutate(payload)?);
        self.tables.replace(txn, entry)?;
        Ok(true)
    }

    /// Entries in this schema whose dependency set contains `oid`.
    pub fn dependents_of(&self, txn: &CatalogTxn, oid: EntryOid) -> Vec<(EntryKind, String)> {
        let mut dependents = Vec::new();
        for set in self.all_sets() {
            for (name, entry) in set.visible(txn) {
                if entry.dependencies().contains(&oid) {
                    dependents.push((entry.kind(), name));
                }
            }
        }
        dependents
    }

    pub fn similar_entry(
        &self,
        txn: &CatalogTxn,
        kind: EntryKind,
        name: &str,
    ) -> Option<SimilarMatch> {
        self.entry_set(kind).ok()?.similar(txn, name)
    }

    pub fn scan(
        &self,
        txn: &CatalogTxn,
        kind: EntryKind,
        visitor: &mut dyn FnMut(&Arc<CatalogEntry>),
    ) -> CatalogResult<()> {
        self.entry_set(kind)?.scan(txn, visitor);
        Ok(())
    }

    /// Rewrite the schema back-reference of every visible entry; called
    /// after the schema itself moved to a new name.
    pub(crate) fn rewrite_entries_for_rename(&self, txn: &CatalogTxn) -> CatalogResult<()> {
        let new_name = self.name();
        for set in self.all_sets() {
            for (_, entry) in set.visible(txn) {
                if entry.header.schema != new_name {
                    set.replace(txn, entry.with_schema(new_name))?;
                }
            }
        }
        Ok(())
    }

    /// Reject writes that would close a dependency cycle through `entry`.
    fn check_dependency_cycle(&self, txn: &CatalogTxn, entry: &CatalogEntry) -> CatalogResult<()> {
        if entry.dependencies().is_empty() {
            return Ok(());
        }
        // Existing entries are acyclic, so any new cycle passes through the
        // new entry: walk its dependency closure looking for its own oid.
        let mut deps_by_oid: HashMap<EntryOid, Vec<EntryOid>> = HashMap::new();
        for set in self.all_sets() {
            for (_, existing) in set.visible(txn) {
                deps_by_oid.insert(
                    existing.oid(),
                    existing.dependencies().iter().copied().collect(),
                );
            }
        }
        let mut stack: Vec<EntryOid> = entry.dependencies().iter().copied().collect();
        let mut seen: HashSet<EntryOid> = HashSet::new();
        while let Some(oid) = stack.pop() {
            if oid == entry.oid() {
                return Err(CatalogError::InvalidArgument {
                    reason: format!(
                        "dependency cycle detected through entry \"{}\"",
                        entry.name()
                    ),
                });
            }
            if !seen.insert(oid) {
                continue;
            }
            if let Some(next) = deps_by_oid.get(&oid) {
                stack.extend(next.iter().copied());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quill_common::{IsolationLevel, Transaction};

    use super::*;
    use crate::txn::manager::CatalogTxnManager;

    fn begin(mgr: &CatalogTxnManager) -> Arc<CatalogTxn> {
        mgr.begin_transaction(IsolationLevel::Snapshot).unwrap()
    }

    fn table_info(name: &str) -> CreateTableInfo {
        CreateTableInfo {
            base: CreateInfoBase::new(name),
            columns: vec![],
        }
    }

    #[test]
    fn same_name_different_kinds_coexist() {
        let mgr = CatalogTxnManager::new();
        let schema = SchemaEntry::new("db", "main");
        let txn = begin(&mgr);
        schema.create_table(&txn, &table_info("pi")).unwrap();
        schema
            .create_macro(&txn, &CreateMacroInfo {
                base: CreateInfoBase::new("pi"),
                overloads: vec![],
            })
            .unwrap();
        assert!(schema.get_entry(&txn, EntryKind::Table, "pi").is_some());
        assert!(schema.get_entry(&txn, EntryKind::Macro, "pi").is_some());
        txn.commit().unwrap();
    }

    #[test]
    fn index_depends_on_table() {
        let mgr = CatalogTxnManager::new();
        let schema = SchemaEntry::new("db", "main");
        let txn = begin(&mgr);
        schema.create_table(&txn, &table_info("t")).unwrap();
        schema
            .create_index(&txn, &CreateIndexInfo {
                base: CreateInfoBase::new("t_idx"),
                table: "t".to_string(),
                column_ids: vec![0],
                unique: false,
                sql: None,
            })
            .unwrap();

        // Table is pinned by the index.
        let err = schema
            .drop_entry(&txn, &DropInfo::new(EntryKind::Table, "t"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::HasDependents { .. }));

        // Cascade removes the index too.
        schema
            .drop_entry(&txn, &DropInfo::new(EntryKind::Table, "t").cascade())
            .unwrap();
        assert!(schema.get_entry(&txn, EntryKind::Index, "t_idx").is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn alter_add_column_and_set_default() {
        let mgr = CatalogTxnManager::new();
        let schema = SchemaEntry::new("db", "main");
        let txn = begin(&mgr);
        schema.create_table(&txn, &table_info("t")).unwrap();
        schema
            .alter(&txn, &AlterInfo::AddColumn {
                catalog: String::new(),
                schema: String::new(),
                table: "t".to_string(),
                column: crate::entry::ColumnDefinition::new(
                    "c",
                    quill_common::data_type::LogicalType::Int32,
                ),
                if_exists: false,
            })
            .unwrap();
        schema
            .alter(&txn, &AlterInfo::SetDefault {
                catalog: String::new(),
                schema: String::new(),
                table: "t".to_string(),
                column: "c".to_string(),
                default_value: Some("42".to_string()),
                if_exists: false,
            })
            .unwrap();
        let entry = schema.get_entry(&txn, EntryKind::Table, "t").unwrap();
        let EntryPayload::Table(table) = &entry.payload else {
            panic!("expected table payload");
        };
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.columns[0].default_value.as_deref(), Some("42"));
        txn.commit().unwrap();
    }
}
