//! Operation descriptors for create/drop/alter. These are produced by the
//! binder and consumed by the catalog dispatch layer; they carry the target
//! name (possibly partially qualified) plus kind-specific payload fields.

use quill_common::constants::{INVALID_CATALOG, INVALID_SCHEMA};
use quill_common::data_type::LogicalType;
use serde::{Deserialize, Serialize};

use crate::entry::{
    AggregateFunctionEntry, ColumnDefinition, EntryKind, MacroDefinition, ScalarFunctionEntry,
    SequenceEntry, TableFunctionSignature,
};

/// What to do when a create finds a same-named entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCreateConflict {
    /// Fail with an already-exists error.
    Error,
    /// Keep the existing entry and return it.
    Ignore,
    /// Atomically substitute the existing entry.
    Replace,
    /// Alter the existing entry with the new payload (functions merge their
    /// overload sets).
    AlterOnConflict,
}

/// Fields common to every create operation.
#[derive(Debug, Clone)]
pub struct CreateInfoBase {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub on_conflict: OnCreateConflict,
    pub temporary: bool,
    pub internal: bool,
}

impl CreateInfoBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: INVALID_CATALOG.to_string(),
            schema: INVALID_SCHEMA.to_string(),
            name: name.into(),
            on_conflict: OnCreateConflict::Error,
            temporary: false,
            internal: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    pub fn with_on_conflict(mut self, on_conflict: OnCreateConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateSchemaInfo {
    pub base: CreateInfoBase,
}

#[derive(Debug, Clone)]
pub struct CreateTableInfo {
    pub base: CreateInfoBase,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone)]
pub struct CreateViewInfo {
    pub base: CreateInfoBase,
    pub sql: String,
    pub column_aliases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSequenceInfo {
    pub base: CreateInfoBase,
    pub sequence: SequenceEntry,
}

#[derive(Debug, Clone)]
pub struct CreateTypeInfo {
    pub base: CreateInfoBase,
    pub ty: LogicalType,
}

/// Scalar and aggregate functions share one create path.
#[derive(Debug, Clone)]
pub enum FunctionDescriptor {
    Scalar(ScalarFunctionEntry),
    Aggregate(AggregateFunctionEntry),
}

impl FunctionDescriptor {
    pub fn kind(&self) -> EntryKind {
        match self {
            FunctionDescriptor::Scalar(_) => EntryKind::ScalarFunction,
            FunctionDescriptor::Aggregate(_) => EntryKind::AggregateFunction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateFunctionInfo {
    pub base: CreateInfoBase,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone)]
pub struct CreateTableFunctionInfo {
    pub base: CreateInfoBase,
    pub overloads: Vec<TableFunctionSignature>,
}

#[derive(Debug, Clone)]
pub struct CreatePragmaFunctionInfo {
    pub base: CreateInfoBase,
    pub parameters: Vec<LogicalType>,
}

#[derive(Debug, Clone)]
pub struct CreateCopyFunctionInfo {
    pub base: CreateInfoBase,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct CreateMacroInfo {
    pub base: CreateInfoBase,
    pub overloads: Vec<MacroDefinition>,
}

#[derive(Debug, Clone)]
pub struct CreateCollationInfo {
    pub base: CreateInfoBase,
    pub function: String,
    pub combinable: bool,
}

#[derive(Debug, Clone)]
pub struct CreateIndexInfo {
    pub base: CreateInfoBase,
    /// Name of the indexed table; resolved in the same schema.
    pub table: String,
    pub column_ids: Vec<usize>,
    pub unique: bool,
    pub sql: Option<String>,
}

/// Descriptor for dropping any entry kind, schemas included.
#[derive(Debug, Clone)]
pub struct DropInfo {
    pub kind: EntryKind,
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub if_exists: bool,
    pub cascade: bool,
}

impl DropInfo {
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            catalog: INVALID_CATALOG.to_string(),
            schema: INVALID_SCHEMA.to_string(),
            name: name.into(),
            if_exists: false,
            cascade: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Typed alter operations. Each variant names its target; rename applies to
/// any kind, the column alters to tables only.
#[derive(Debug, Clone)]
pub enum AlterInfo {
    Rename {
        kind: EntryKind,
        catalog: String,
        schema: String,
        name: String,
        new_name: String,
        if_exists: bool,
    },
    AddColumn {
        catalog: String,
        schema: String,
        table: String,
        column: ColumnDefinition,
        if_exists: bool,
    },
    SetDefault {
        catalog: String,
        schema: String,
        table: String,
        column: String,
        default_value: Option<String>,
        if_exists: bool,
    },
}

impl AlterInfo {
    pub fn kind(&self) -> EntryKind {
        match self {
            AlterInfo::Rename { kind, .. } => *kind,
            AlterInfo::AddColumn { .. } | AlterInfo::SetDefault { .. } => EntryKind::Table,
        }
    }

    pub fn catalog(&self) -> &str {
        match self {
            AlterInfo::Rename { catalog, .. }
            | AlterInfo::AddColumn { catalog, .. }
            | AlterInfo::SetDefault { catalog, .. } => catalog,
        }
    }

    pub fn schema(&self) -> &str {
        match self {
            AlterInfo::Rename { schema, .. }
            | AlterInfo::AddColumn { schema, .. }
            | AlterInfo::SetDefault { schema, .. } => schema,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AlterInfo::Rename { name, .. } => name,
            AlterInfo::AddColumn { table, .. } | AlterInfo::SetDefault { table, .. } => table,
        }
    }

    pub fn if_exists(&self) -> bool {
        match self {
            AlterInfo::Rename { if_exists, .. }
            | AlterInfo::AddColumn { if_exists, .. }
            | AlterInfo::SetDefault { if_exists, .. } => *if_exists,
        }
    }
}
