//! MVCC version chains for catalog objects.
//!
//! Each key maps to a chain of version nodes, newest first. A node carries
//! either a value or a tombstone, the id of the transaction that created it,
//! and the commit timestamp once that transaction commits. Readers walk the
//! chain for the first node visible at their snapshot; writers append
//! uncommitted nodes that stay private until commit.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use quill_common::{IsolationLevel, Timestamp, Transaction};

use crate::txn::catalog_txn::{CatalogTxn, TxnHook};
use crate::txn::error::{CatalogTxnError, CatalogTxnResult};

/// Type of write operation, used for commit validation.
#[derive(Clone, Copy, Debug)]
pub enum WriteOp {
    Create,
    Delete,
    Replace,
}

/// A write recorded in a transaction's touched set.
#[derive(Debug)]
pub struct TouchedItem<K, V> {
    pub key: K,
    pub node: Arc<VersionNode<V>>,
    pub op: WriteOp,
}

/// Commit plan produced by validation, applied without re-lookup.
#[derive(Debug)]
pub struct CommitPlan<K, V> {
    pub key: K,
    pub node: Arc<VersionNode<V>>,
}

#[derive(Debug)]
pub struct VersionedMap<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Send + Sync + 'static,
{
    inner: RwLock<HashMap<K, VersionChain<V>>>,
    // Chains are numbered at creation so scans can report insertion order.
    next_seq: AtomicU64,
}

impl<K, V> Default for VersionedMap<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl<K, V> VersionedMap<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + std::fmt::Debug + 'static,
{
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible node for the key, tombstones excluded.
    pub fn get_node_visible(
        &self,
        key: &K,
        start_ts: Timestamp,
        txn_id: Timestamp,
    ) -> Option<Arc<VersionNode<V>>> {
        let guard = self.inner.read().unwrap();
        let chain = guard.get(key)?;
        let node = chain.visible_at(start_ts, txn_id)?;
        if node.is_tombstone() {
            return None;
        }
        Some(node)
    }

    /// Visible value for the key; registers a read-validation hook when the
    /// transaction is serializable.
    pub fn get(self: &Arc<Self>, key: &K, txn: &CatalogTxn) -> Option<Arc<V>> {
        let start_ts = txn.start_ts();
        let txn_id = txn.txn_id();
        let value = {
            let guard = self.inner.read().unwrap();
            let chain = guard.get(key)?;
            let node = chain.visible_at(start_ts, txn_id)?;
            if node.is_tombstone() {
                return None;
            }
            node.value()
        };
        if matches!(txn.isolation_level(), IsolationLevel::Serializable) {
            txn.add_hook(Box::new(ReadValidateHook {
                map: Arc::downgrade(self),
                key: key.clone(),
                start_ts,
            }));
        }
        value
    }

    /// Keys visible and non-tombstone under the given snapshot, in chain
    /// creation order.
    pub fn visible_keys(&self, start_ts: Timestamp, txn_id: Timestamp) -> Vec<K> {
        self.visible_entries(start_ts, txn_id)
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    /// Visible `(key, value)` pairs in chain creation order.
    pub fn visible_entries(&self, start_ts: Timestamp, txn_id: Timestamp) -> Vec<(K, Arc<V>)> {
        let guard = self.inner.read().unwrap();
        let mut entries: Vec<(u64, K, Arc<V>)> = guard
            .iter()
            .filter_map(|(k, chain)| {
                let node = chain.visible_at(start_ts, txn_id)?;
                if node.is_tombstone() {
                    return None;
                }
                node.value().map(|v| (chain.seq, k.clone(), v))
            })
            .collect();
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries.into_iter().map(|(_, k, v)| (k, v)).collect()
    }

    /// Whether the key was committed by another transaction after `start_ts`.
    pub fn was_modified_after(
        &self,
        key: &K,
        start_ts: Timestamp,
        txn_id: Timestamp,
    ) -> CatalogTxnResult<bool> {
        let guard = self.inner.read().map_err(|_| CatalogTxnError::IllegalState {
            reason: "map rwlock poisoned".into(),
        })?;
        if let Some(chain) = guard.get(key)
            && let Some(head) = chain.head()
            && let Some(commit_ts) = head.commit_ts()
            && commit_ts > start_ts
            && head.creator_txn() != txn_id
        {
            return Ok(true);
        }
        Ok(false)
    }

    /// Append an uncommitted value version and return its node handle. The
    /// current head, if any, must be visible to the writer.
    pub fn put(
        &self,
        key: K,
        value: Arc<V>,
        txn: &CatalogTxn,
    ) -> CatalogTxnResult<Arc<VersionNode<V>>> {
        let mut guard = self.inner.write().unwrap();
        let seq = &self.next_seq;
        let chain = guard
            .entry(key.clone())
            .or_insert_with(|| VersionChain::with_seq(seq.fetch_add(1, Ordering::Relaxed)));
        let start_ts = txn.start_ts();
        let txn_id = txn.txn_id();
        if let Some(head) = chain.head() {
            if !head.visible_for(start_ts, txn_id) {
                return Err(CatalogTxnError::WriteConflict {
                    key: format!("{key:?}"),
                });
            }
            if head.commit_ts().is_none() && head.creator_txn() == txn_id {
                head.overwrite_uncommitted(txn_id, Some(value), false)?;
                return Ok(head);
            }
        }
        Ok(chain.append_uncommitted(Some(value), false, txn_id))
    }

    /// Append an uncommitted tombstone version and return its node handle.
    pub fn delete(&self, key: &K, txn: &CatalogTxn) -> CatalogTxnResult<Arc<VersionNode<V>>> {
        let mut guard = self.inner.write().unwrap();
        let seq = &self.next_seq;
        let chain = guard
            .entry(key.clone())
            .or_insert_with(|| VersionChain::with_seq(seq.fetch_add(1, Ordering::Relaxed)));
        let start_ts = txn.start_ts();
        let txn_id = txn.txn_id();
        if let Some(head) = chain.head() {
            if !head.visible_for(start_ts, txn_id) {
                return Err(CatalogTxnError::WriteConflict {
                    key: format!("{key:?}"),
                });
            }
            if head.commit_ts().is_none() && head.creator_txn() == txn_id {
                head.overwrite_uncommitted(txn_id, None, true)?;
                return Ok(head);
            }
        }
        Ok(chain.append_uncommitted(None, true, txn_id))
    }

    /// Validate a batch of touched items and produce commit plans. The head
    /// of every touched chain must still be the node this transaction wrote.
    pub fn validate_batch(
        &self,
        items: &[TouchedItem<K, V>],
    ) -> CatalogTxnResult<Vec<CommitPlan<K, V>>> {
        let guard = self.inner.read().unwrap();
        let mut plans = Vec::with_capacity(items.len());
        for item in items {
            let chain = guard
                .get(&item.key)
                .ok_or_else(|| CatalogTxnError::IllegalState {
                    reason: format!("missing chain during validate: {:?}", item.key),
                })?;
            let head = chain.head().ok_or_else(|| CatalogTxnError::IllegalState {
                reason: format!("missing head during validate: {:?}", item.key),
            })?;
            if !Arc::ptr_eq(&head, &item.node) {
                return Err(CatalogTxnError::WriteConflict {
                    key: format!("{:?}", item.key),
                });
            }
            plans.push(CommitPlan {
                key: item.key.clone(),
                node: item.node.clone(),
            });
        }
        Ok(plans)
    }

    /// Mark all planned nodes committed at `commit_ts`.
    pub fn apply_batch(
        &self,
        plans: &[CommitPlan<K, V>],
        commit_ts: Timestamp,
    ) -> CatalogTxnResult<()> {
        let guard = self.inner.read().unwrap();
        for plan in plans {
            let chain = guard
                .get(&plan.key)
                .ok_or_else(|| CatalogTxnError::IllegalState {
                    reason: format!("missing chain during apply: {:?}", plan.key),
                })?;
            let head = chain.head().ok_or_else(|| CatalogTxnError::IllegalState {
                reason: format!("missing head during apply: {:?}", plan.key),
            })?;
            if !Arc::ptr_eq(&head, &plan.node) {
                return Err(CatalogTxnError::WriteConflict {
                    key: format!("{:?}", plan.key),
                });
            }
            head.set_committed(commit_ts);
        }
        Ok(())
    }

    /// Validate then apply in one step.
    pub fn commit_batch(
        &self,
        items: &[TouchedItem<K, V>],
        commit_ts: Timestamp,
    ) -> CatalogTxnResult<()> {
        let plans = self.validate_batch(items)?;
        self.apply_batch(&plans, commit_ts)
    }

    /// Roll back uncommitted writes by unlinking them from their chains.
    /// Processed in reverse append order; committed nodes are left alone.
    pub fn abort_batch(&self, items: &[TouchedItem<K, V>]) -> CatalogTxnResult<()> {
        let mut guard = self.inner.write().unwrap();
        for item in items.iter().rev() {
            let chain = guard
                .get_mut(&item.key)
                .ok_or_else(|| CatalogTxnError::IllegalState {
                    reason: format!("missing chain during abort: {:?}", item.key),
                })?;
            if let Some(head) = chain.head()
                && Arc::ptr_eq(&head, &item.node)
                && head.commit_ts().is_none()
            {
                chain.head = head.next();
            }
        }
        Ok(())
    }
}

/// Pre-commit hook validating that a serializable read is still current.
#[derive(Debug)]
struct ReadValidateHook<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + std::fmt::Debug + 'static,
{
    map: Weak<VersionedMap<K, V>>,
    key: K,
    start_ts: Timestamp,
}

impl<K, V> TxnHook for ReadValidateHook<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + std::fmt::Debug + 'static,
{
    fn precommit(&self, txn: &CatalogTxn) -> CatalogTxnResult<()> {
        if let Some(map) = self.map.upgrade()
            && map.was_modified_after(&self.key, self.start_ts, txn.txn_id())?
        {
            return Err(CatalogTxnError::WriteConflict {
                key: format!("{:?}", self.key),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct VersionNode<V> {
    value: Mutex<Option<Arc<V>>>,
    tombstone: Mutex<bool>,
    creator_txn: Timestamp,
    commit_ts: Mutex<Option<Timestamp>>,
    next: Mutex<Option<Arc<VersionNode<V>>>>,
}

impl<V> VersionNode<V> {
    fn new_uncommitted(value: Option<Arc<V>>, tombstone: bool, creator_txn: Timestamp) -> Self {
        Self {
            value: Mutex::new(value),
            tombstone: Mutex::new(tombstone),
            creator_txn,
            commit_ts: Mutex::new(None),
            next: Mutex::new(None),
        }
    }

    fn overwrite_uncommitted(
        &self,
        txn_id: Timestamp,
        value: Option<Arc<V>>,
        tombstone: bool,
    ) -> CatalogTxnResult<()> {
        if self.creator_txn != txn_id || self.commit_ts().is_some() {
            return Err(CatalogTxnError::IllegalState {
                reason: "overwrite of a node not owned by this transaction".to_string(),
            });
        }
        *self.value.lock().unwrap() = value;
        *self.tombstone.lock().unwrap() = tombstone;
        Ok(())
    }

    pub fn set_committed(&self, commit_ts: Timestamp) {
        *self.commit_ts.lock().unwrap() = Some(commit_ts);
    }

    pub fn commit_ts(&self) -> Option<Timestamp> {
        *self.commit_ts.lock().unwrap()
    }

    pub fn creator_txn(&self) -> Timestamp {
        self.creator_txn
    }

    pub fn value(&self) -> Option<Arc<V>> {
        self.value.lock().unwrap().clone()
    }

    pub fn is_tombstone(&self) -> bool {
        *self.tombstone.lock().unwrap()
    }

    pub fn next(&self) -> Option<Arc<VersionNode<V>>> {
        self.next.lock().unwrap().clone()
    }

    fn set_next(&self, next: Option<Arc<VersionNode<V>>>) {
        *self.next.lock().unwrap() = next;
    }

    /// Visible when committed at or before the snapshot, or owned by the
    /// reading transaction.
    pub fn visible_for(&self, start_ts: Timestamp, txn_id: Timestamp) -> bool {
        if let Some(commit_ts) = self.commit_ts() {
            commit_ts <= start_ts
        } else {
            self.creator_txn == txn_id
        }
    }
}

#[derive(Debug)]
struct VersionChain<V> {
    head: Option<Arc<VersionNode<V>>>,
    seq: u64,
}

impl<V> VersionChain<V> {
    fn with_seq(seq: u64) -> Self {
        Self { head: None, seq }
    }

    fn head(&self) -> Option<Arc<VersionNode<V>>> {
        self.head.clone()
    }

    fn visible_at(&self, start_ts: Timestamp, txn_id: Timestamp) -> Option<Arc<VersionNode<V>>> {
        let mut cursor = self.head.clone();
        while let Some(node) = cursor {
            if node.visible_for(start_ts, txn_id) {
                return Some(node);
            }
            cursor = node.next();
        }
        None
    }

    fn append_uncommitted(
        &mut self,
        value: Option<Arc<V>>,
        tombstone: bool,
        creator_txn: Timestamp,
    ) -> Arc<VersionNode<V>> {
        let node = Arc::new(VersionNode::new_uncommitted(value, tombstone, creator_txn));
        node.set_next(self.head.clone());
        self.head = Some(node.clone());
        node
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

    #[test]
    fn uncommitted_write_is_private() {
        let mgr = CatalogTxnManager::new();
        let map: Arc<VersionedMap<String, i32>> = Arc::new(VersionedMap::new());
        let key = "k".to_string();

        let t1 = begin(&mgr);
        let node = map.put(key.clone(), Arc::new(1), &t1).unwrap();
        t1.record_write(&map, key.clone(), node, WriteOp::Create);
        assert_eq!(map.get(&key, &t1).map(|v| *v), Some(1));

        let t2 = begin(&mgr);
        assert!(map.get(&key, &t2).is_none());

        t1.commit().unwrap();
        let t3 = begin(&mgr);
        assert_eq!(map.get(&key, &t3).map(|v| *v), Some(1));
    }

    #[test]
    fn abort_discards_uncommitted_head() {
        let mgr = CatalogTxnManager::new();
        let map: Arc<VersionedMap<String, i32>> = Arc::new(VersionedMap::new());
        let key = "k".to_string();

        let seed = begin(&mgr);
        let node = map.put(key.clone(), Arc::new(21), &seed).unwrap();
        seed.record_write(&map, key.clone(), node, WriteOp::Create);
        seed.commit().unwrap();

        let t = begin(&mgr);
        let node = map.put(key.clone(), Arc::new(42), &t).unwrap();
        t.record_write(&map, key.clone(), node, WriteOp::Replace);
        assert_eq!(map.get(&key, &t).map(|v| *v), Some(42));
        t.abort().unwrap();

        let check = begin(&mgr);
        assert_eq!(map.get(&key, &check).map(|v| *v), Some(21));
    }

    #[test]
    fn concurrent_writers_conflict() {
        let mgr = CatalogTxnManager::new();
        let map: Arc<VersionedMap<String, i32>> = Arc::new(VersionedMap::new());
        let key = "dup".to_string();

        let t1 = begin(&mgr);
        let node = map.put(key.clone(), Arc::new(1), &t1).unwrap();
        t1.record_write(&map, key.clone(), node, WriteOp::Create);

        let t2 = begin(&mgr);
        assert!(matches!(
            map.put(key.clone(), Arc::new(2), &t2),
            Err(CatalogTxnError::WriteConflict { .. })
        ));

        t1.commit().unwrap();
        let t3 = begin(&mgr);
        assert_eq!(map.get(&key, &t3).map(|v| *v), Some(1));
    }

    #[test]
    fn tombstone_hides_value_after_commit() {
        let mgr = CatalogTxnManager::new();
        let map: Arc<VersionedMap<String, i32>> = Arc::new(VersionedMap::new());
        let key = "del".to_string();

        let seed = begin(&mgr);
        let node = map.put(key.clone(), Arc::new(7), &seed).unwrap();
        seed.record_write(&map, key.clone(), node, WriteOp::Create);
        seed.commit().unwrap();

        let t = begin(&mgr);
        let node = map.delete(&key, &t).unwrap();
        t.record_write(&map, key.clone(), node, WriteOp::Delete);
        t.commit().unwrap();

        let check = begin(&mgr);
        assert!(map.get(&key, &check).is_none());
    }

    #[test]
    fn visible_entries_keep_insertion_order() {
        let mgr = CatalogTxnManager::new();
        let map: Arc<VersionedMap<String, i32>> = Arc::new(VersionedMap::new());

        let t = begin(&mgr);
        for (i, key) in ["zeta", "alpha", "mid"].iter().enumerate() {
            let node = map.put(key.to_string(), Arc::new(i as i32), &t).unwrap();
            t.record_write(&map, key.to_string(), node, WriteOp::Create);
        }
        t.commit().unwrap();

        let check = begin(&mgr);
        let keys = map.visible_keys(check.start_ts(), check.txn_id());
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
