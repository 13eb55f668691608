use serde::{Deserialize, Serialize};

use crate::entry::EntryOid;

/// Index metadata. The indexed table is recorded in the entry's dependency
/// set as well, which blocks dropping the table underneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub table: EntryOid,
    pub column_ids: Vec<usize>,
    pub unique: bool,
    /// Original statement text, kept for SHOW/EXPORT.
    pub sql: Option<String>,
}
