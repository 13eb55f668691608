//! The per-`(schema, kind)` entry registry: a versioned name → entry map
//! with conflict handling, rename, ordered scans and closest-match search.

use std::sync::Arc;

use quill_common::Transaction;
use quill_common::string::levenshtein;

use crate::entry::{CatalogEntry, EntryKind, EntryOps};
use crate::error::{CatalogError, CatalogResult};
use crate::info::OnCreateConflict;
use crate::txn::catalog_txn::CatalogTxn;
use crate::txn::versioned::{VersionedMap, WriteOp};

/// Closest entry found by [`EntrySet::similar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarMatch {
    pub name: String,
    pub distance: usize,
}

/// Suggestions further than this are considered noise.
#[inline]
pub fn distance_threshold(name: &str) -> usize {
    name.len() / 2 + 1
}

#[derive(Debug)]
pub struct EntrySet {
    kind: EntryKind,
    map: Arc<VersionedMap<String, CatalogEntry>>,
}

impl EntrySet {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            map: Arc::new(VersionedMap::new()),
        }
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Entry visible under `txn`, if any.
    pub fn get(&self, txn: &CatalogTxn, name: &str) -> Option<Arc<CatalogEntry>> {
        self.map.get(&name.to_string(), txn)
    }

    pub fn is_empty(&self, txn: &CatalogTxn) -> bool {
        self.map
            .visible_entries(txn.start_ts(), txn.txn_id())
            .is_empty()
    }

    /// Visible `(name, entry)` pairs in insertion order.
    pub fn visible(&self, txn: &CatalogTxn) -> Vec<(String, Arc<CatalogEntry>)> {
        self.map.visible_entries(txn.start_ts(), txn.txn_id())
    }

    /// Visit visible entries in insertion order.
    pub fn scan(&self, txn: &CatalogTxn, visitor: &mut dyn FnMut(&Arc<CatalogEntry>)) {
        for (_, entry) in self.visible(txn) {
            visitor(&entry);
        }
    }

    /// Insert a new entry, resolving a same-named survivor per `on_conflict`.
    pub fn create(
        &self,
        txn: &CatalogTxn,
        entry: CatalogEntry,
        on_conflict: OnCreateConflict,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        txn.check_interrupted()?;
        if entry.kind() != self.kind {
            return Err(CatalogError::TypeMismatch {
                name: entry.name().to_string(),
                existing: self.kind,
                requested: entry.kind(),
            });
        }
        let name = entry.name().to_string();
        if let Some(existing) = self.get(txn, &name) {
            return match on_conflict {
                OnCreateConflict::Error => Err(CatalogError::AlreadyExists {
                    kind: self.kind,
                    name,
                }),
                OnCreateConflict::Ignore => Ok(existing),
                OnCreateConflict::Replace => self.put(txn, name, entry, WriteOp::Replace),
                OnCreateConflict::AlterOnConflict => {
                    let merged = existing.merged_with(&entry);
                    self.put(txn, name, merged, WriteOp::Replace)
                }
            };
        }
        self.put(txn, name, entry, WriteOp::Create)
    }

    /// Tombstone an entry. Returns the dropped entry, or `None` when absent
    /// and `if_exists` was set.
    pub fn drop_entry(
        &self,
        txn: &CatalogTxn,
        name: &str,
        if_exists: bool,
    ) -> CatalogResult<Option<Arc<CatalogEntry>>> {
        txn.check_interrupted()?;
        let Some(existing) = self.get(txn, name) else {
            if if_exists {
                return Ok(None);
            }
            return Err(CatalogError::not_found(self.kind, name));
        };
        let key = name.to_string();
        let node = self.map.delete(&key, txn)?;
        txn.record_write(&self.map, key, node, WriteOp::Delete);
        Ok(Some(existing))
    }

    /// Move an entry to a new name, which must be free at this snapshot.
    pub fn rename(
        &self,
        txn: &CatalogTxn,
        name: &str,
        new_name: &str,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        txn.check_interrupted()?;
        let Some(existing) = self.get(txn, name) else {
            return Err(CatalogError::not_found(self.kind, name));
        };
        if self.get(txn, new_name).is_some() {
            return Err(CatalogError::AlreadyExists {
                kind: self.kind,
                name: new_name.to_string(),
            });
        }
        let key = name.to_string();
        let node = self.map.delete(&key, txn)?;
        txn.record_write(&self.map, key, node, WriteOp::Delete);
        self.put(txn, new_name.to_string(), existing.renamed(new_name), WriteOp::Create)
    }

    /// Replace the payload under an existing name (column alters, schema
    /// rename rewrites).
    pub fn replace(
        &self,
        txn: &CatalogTxn,
        entry: CatalogEntry,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        txn.check_interrupted()?;
        let name = entry.name().to_string();
        self.put(txn, name, entry, WriteOp::Replace)
    }

    fn put(
        &self,
        txn: &CatalogTxn,
        key: String,
        entry: CatalogEntry,
        op: WriteOp,
    ) -> CatalogResult<Arc<CatalogEntry>> {
        let value = Arc::new(entry);
        let node = self.map.put(key.clone(), value.clone(), txn)?;
        txn.record_write(&self.map, key, node, op);
        Ok(value)
    }

    /// Lowest-edit-distance visible entry, compared case-insensitively.
    /// Ties go to the earliest-created entry; matches beyond the distance
    /// cap are discarded.
    pub fn similar(&self, txn: &CatalogTxn, name: &str) -> Option<SimilarMatch> {
        let threshold = distance_threshold(name);
        let mut best: Option<SimilarMatch> = None;
        for (candidate, _) in self.visible(txn) {
            let distance = levenshtein(&candidate, name);
            if distance > threshold {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(SimilarMatch {
                    name: candidate,
                    distance,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use quill_common::{IsolationLevel, Transaction};

    use super::*;
    use crate::entry::{EntryHeader, EntryPayload, TableEntry};
    use crate::txn::manager::CatalogTxnManager;

    fn table(name: &str) -> CatalogEntry {
        CatalogEntry::new(
            EntryHeader::new(name, "db", "main"),
            EntryPayload::Table(TableEntry::default()),
        )
    }

    fn begin(mgr: &CatalogTxnManager) -> Arc<CatalogTxn> {
        mgr.begin_transaction(IsolationLevel::Snapshot).unwrap()
    }

    #[test]
    fn create_then_get() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        set.create(&txn, table("t"), OnCreateConflict::Error).unwrap();
        assert!(set.get(&txn, "t").is_some());
        txn.commit().unwrap();
    }

    #[test]
    fn conflict_modes() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        set.create(&txn, table("t"), OnCreateConflict::Error).unwrap();

        let err = set
            .create(&txn, table("t"), OnCreateConflict::Error)
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists { .. }));

        let kept = set
            .create(&txn, table("t"), OnCreateConflict::Ignore)
            .unwrap();
        assert_eq!(kept.name(), "t");

        let replaced = set
            .create(&txn, table("t"), OnCreateConflict::Replace)
            .unwrap();
        assert_eq!(replaced.name(), "t");
        txn.commit().unwrap();
    }

    #[test]
    fn drop_then_recreate_succeeds() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        set.create(&txn, table("t"), OnCreateConflict::Error).unwrap();
        txn.commit().unwrap();

        let txn = begin(&mgr);
        set.drop_entry(&txn, "t", false).unwrap();
        assert!(set.get(&txn, "t").is_none());
        set.create(&txn, table("t"), OnCreateConflict::Error).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn drop_missing_respects_if_exists() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        assert!(set.drop_entry(&txn, "ghost", true).unwrap().is_none());
        assert!(set.drop_entry(&txn, "ghost", false).is_err());
    }

    #[test]
    fn rename_checks_target_name() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        set.create(&txn, table("a"), OnCreateConflict::Error).unwrap();
        set.create(&txn, table("b"), OnCreateConflict::Error).unwrap();

        let err = set.rename(&txn, "a", "b").unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists { .. }));

        set.rename(&txn, "a", "c").unwrap();
        assert!(set.get(&txn, "a").is_none());
        assert!(set.get(&txn, "c").is_some());
    }

    #[test]
    fn similar_picks_closest_with_insertion_tiebreak() {
        let mgr = CatalogTxnManager::new();
        let set = EntrySet::new(EntryKind::Table);
        let txn = begin(&mgr);
        for name in ["customers", "costumes", "orders"] {
            set.create(&txn, table(name), OnCreateConflict::Error).unwrap();
        }
        let hit = set.similar(&txn, "custmers").unwrap();
        assert_eq!(hit.name, "customers");
        assert_eq!(hit.distance, 1);
        assert!(set.similar(&txn, "zzzzzzzzzzzz").is_none());
    }
}
