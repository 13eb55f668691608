//! The entry model: every named object a schema can hold, as one closed sum
//! type with a shared header and kind-specific payloads.

pub mod collation;
pub mod function;
pub mod index;
pub mod sequence;
pub mod table;
pub mod types;
pub mod view;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use collation::CollationEntry;
pub use function::{
    AggregateFunctionEntry, CopyFunctionEntry, FunctionSignature, MacroDefinition, MacroEntry,
    PragmaFunctionEntry, ScalarFunctionEntry, TableFunctionEntry, TableFunctionSignature,
};
pub use index::IndexEntry;
pub use sequence::SequenceEntry;
pub use table::{ColumnDefinition, TableEntry};
pub use types::TypeEntry;
pub use view::ViewEntry;

/// Opaque monotone identifier assigned at entry creation.
pub type EntryOid = u64;

static OID_GENERATOR: OnceLock<AtomicU64> = OnceLock::new();

/// Process-wide oid assignment; oids are never reused.
pub fn next_oid() -> EntryOid {
    OID_GENERATOR
        .get_or_init(|| AtomicU64::new(1))
        .fetch_add(1, Ordering::SeqCst)
}

/// Closed set of entry kinds. Each kind has its own namespace within a
/// schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Schema,
    Table,
    View,
    Sequence,
    Type,
    ScalarFunction,
    AggregateFunction,
    TableFunction,
    PragmaFunction,
    CopyFunction,
    Macro,
    Collation,
    Index,
}

impl EntryKind {
    /// Kinds that live inside a schema (everything but `Schema` itself).
    pub const IN_SCHEMA: [EntryKind; 12] = [
        EntryKind::Table,
        EntryKind::View,
        EntryKind::Sequence,
        EntryKind::Type,
        EntryKind::ScalarFunction,
        EntryKind::AggregateFunction,
        EntryKind::TableFunction,
        EntryKind::PragmaFunction,
        EntryKind::CopyFunction,
        EntryKind::Macro,
        EntryKind::Collation,
        EntryKind::Index,
    ];

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            EntryKind::ScalarFunction | EntryKind::AggregateFunction | EntryKind::TableFunction
        )
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Schema => "Schema",
            EntryKind::Table => "Table",
            EntryKind::View => "View",
            EntryKind::Sequence => "Sequence",
            EntryKind::Type => "Type",
            EntryKind::ScalarFunction => "Scalar Function",
            EntryKind::AggregateFunction => "Aggregate Function",
            EntryKind::TableFunction => "Table Function",
            EntryKind::PragmaFunction => "Pragma Function",
            EntryKind::CopyFunction => "Copy Function",
            EntryKind::Macro => "Macro",
            EntryKind::Collation => "Collation",
            EntryKind::Index => "Index",
        };
        write!(f, "{s}")
    }
}

/// Fields shared by every entry regardless of kind. The catalog and schema
/// fields are back-references resolved by name through the database
/// manager; they are rewritten when the owning schema is renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHeader {
    pub oid: EntryOid,
    pub name: String,
    pub catalog: String,
    pub schema: String,
    pub dependencies: BTreeSet<EntryOid>,
    /// Built-in entries cannot be dropped by users.
    pub internal: bool,
    pub temporary: bool,
}

impl EntryHeader {
    pub fn new(name: impl Into<String>, catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            oid: next_oid(),
            name: name.into(),
            catalog: catalog.into(),
            schema: schema.into(),
            dependencies: BTreeSet::new(),
            internal: false,
            temporary: false,
        }
    }
}

/// Kind-specific payload of a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntryPayload {
    Table(TableEntry),
    View(ViewEntry),
    Sequence(SequenceEntry),
    Type(TypeEntry),
    ScalarFunction(ScalarFunctionEntry),
    AggregateFunction(AggregateFunctionEntry),
    TableFunction(TableFunctionEntry),
    PragmaFunction(PragmaFunctionEntry),
    CopyFunction(CopyFunctionEntry),
    Macro(MacroEntry),
    Collation(CollationEntry),
    Index(IndexEntry),
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryPayload::Table(_) => EntryKind::Table,
            EntryPayload::View(_) => EntryKind::View,
            EntryPayload::Sequence(_) => EntryKind::Sequence,
            EntryPayload::Type(_) => EntryKind::Type,
            EntryPayload::ScalarFunction(_) => EntryKind::ScalarFunction,
            EntryPayload::AggregateFunction(_) => EntryKind::AggregateFunction,
            EntryPayload::TableFunction(_) => EntryKind::TableFunction,
            EntryPayload::PragmaFunction(_) => EntryKind::PragmaFunction,
            EntryPayload::CopyFunction(_) => EntryKind::CopyFunction,
            EntryPayload::Macro(_) => EntryKind::Macro,
            EntryPayload::Collation(_) => EntryKind::Collation,
            EntryPayload::Index(_) => EntryKind::Index,
        }
    }
}

/// A named, typed object inside a schema.
///
/// Entries are immutable snapshots; every mutation produces a new value
/// appended to the owning registry's version chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub header: EntryHeader,
    pub payload: EntryPayload,
}

/// The narrow set of operations every entry kind supports.
pub trait EntryOps {
    /// Kind tag of the payload.
    fn kind(&self) -> EntryKind;
    /// Copy of the entry under a new name, same oid.
    fn renamed(&self, new_name: &str) -> CatalogEntry;
    /// Oids of the entries this entry refers to.
    fn dependencies(&self) -> &BTreeSet<EntryOid>;
}

impl CatalogEntry {
    pub fn new(header: EntryHeader, payload: EntryPayload) -> Self {
        Self { header, payload }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    #[inline]
    pub fn oid(&self) -> EntryOid {
        self.header.oid
    }

    /// Copy of the entry re-homed under a renamed schema.
    pub fn with_schema(&self, schema: &str) -> CatalogEntry {
        let mut entry = self.clone();
        entry.header.schema = schema.to_string();
        entry
    }

    /// Copy of the entry with an extra dependency.
    pub fn with_dependency(mut self, oid: EntryOid) -> CatalogEntry {
        self.header.dependencies.insert(oid);
        self
    }

    /// Merge for create-with-alter conflicts: function kinds accumulate
    /// overloads, everything else takes the new payload wholesale.
    pub fn merged_with(&self, new: &CatalogEntry) -> CatalogEntry {
        let payload = match (&self.payload, &new.payload) {
            (EntryPayload::ScalarFunction(old), EntryPayload::ScalarFunction(fresh)) => {
                EntryPayload::ScalarFunction(old.merged(fresh))
            }
            (EntryPayload::AggregateFunction(old), EntryPayload::AggregateFunction(fresh)) => {
                EntryPayload::AggregateFunction(old.merged(fresh))
            }
            (EntryPayload::TableFunction(old), EntryPayload::TableFunction(fresh)) => {
                EntryPayload::TableFunction(old.merged(fresh))
            }
            (EntryPayload::Macro(old), EntryPayload::Macro(fresh)) => {
                EntryPayload::Macro(old.merged(fresh))
            }
            _ => new.payload.clone(),
        };
        let mut entry = self.clone();
        entry.payload = payload;
        entry.header.dependencies = new.header.dependencies.clone();
        entry
    }
}

impl EntryOps for CatalogEntry {
    fn kind(&self) -> EntryKind {
        self.payload.kind()
    }

    fn renamed(&self, new_name: &str) -> CatalogEntry {
        let mut entry = self.clone();
        entry.header.name = new_name.to_string();
        entry
    }

    fn dependencies(&self) -> &BTreeSet<EntryOid> {
        &self.header.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oids_are_monotone() {
        let a = next_oid();
        let b = next_oid();
        assert!(b > a);
    }

    #[test]
    fn rename_keeps_oid() {
        let entry = CatalogEntry::new(
            EntryHeader::new("t", "db", "main"),
            EntryPayload::Table(TableEntry::default()),
        );
        let renamed = entry.renamed("u");
        assert_eq!(renamed.name(), "u");
        assert_eq!(renamed.oid(), entry.oid());
    }

    #[test]
    fn kind_display_matches_diagnostics() {
        assert_eq!(EntryKind::Table.to_string(), "Table");
        assert_eq!(EntryKind::ScalarFunction.to_string(), "Scalar Function");
    }
}
