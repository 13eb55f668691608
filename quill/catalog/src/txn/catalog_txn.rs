use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use quill_common::{IsolationLevel, Timestamp, Transaction, global_timestamp_generator};

use crate::txn::error::{CatalogTxnError, CatalogTxnResult};
use crate::txn::manager::CatalogTxnManagerInner;
use crate::txn::versioned::{TouchedItem, VersionNode, VersionedMap, WriteOp};

fn encode_commit_ts(opt: Option<Timestamp>) -> u64 {
    opt.map(|ts| ts.raw()).unwrap_or(0)
}

fn decode_commit_ts(raw: u64) -> Option<Timestamp> {
    (raw != 0).then(|| Timestamp::with_ts(raw))
}

/// Touched set that supports batch commit and abort.
trait TxnTouchedSet: Send + Sync {
    fn commit(&self, commit_ts: Timestamp) -> CatalogTxnResult<()>;
    fn abort(&self) -> CatalogTxnResult<()>;
}

struct VersionedMapTouched<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + std::fmt::Debug + 'static,
{
    map: Weak<VersionedMap<K, V>>,
    items: Vec<TouchedItem<K, V>>,
}

impl<K, V> TxnTouchedSet for VersionedMapTouched<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + std::fmt::Debug + 'static,
{
    fn commit(&self, commit_ts: Timestamp) -> CatalogTxnResult<()> {
        match self.map.upgrade() {
            Some(map) => map.commit_batch(&self.items, commit_ts),
            // The map was dropped with its catalog; nothing to commit into.
            None => Ok(()),
        }
    }

    fn abort(&self) -> CatalogTxnResult<()> {
        match self.map.upgrade() {
            Some(map) => map.abort_batch(&self.items),
            None => Ok(()),
        }
    }
}

/// Pre-commit hook interface, e.g. serializable read validation.
pub trait TxnHook: Send + Sync {
    fn precommit(&self, txn: &CatalogTxn) -> CatalogTxnResult<()>;
}

/// A catalog transaction: the handle threaded through every catalog
/// mutation. Reads resolve against its snapshot; writes are recorded here
/// and become visible to others only at commit.
pub struct CatalogTxn {
    txn_id: Timestamp,
    start_ts: Timestamp,
    commit_ts_raw: AtomicU64, // 0 means not committed yet.
    isolation: IsolationLevel,
    touched: Mutex<Vec<Box<dyn TxnTouchedSet>>>,
    hooks: Mutex<Vec<Box<dyn TxnHook>>>,
    interrupt: Option<Arc<AtomicBool>>,
    mgr: Weak<CatalogTxnManagerInner>,
}

impl CatalogTxn {
    pub(crate) fn new(
        txn_id: Timestamp,
        start_ts: Timestamp,
        isolation: IsolationLevel,
        interrupt: Option<Arc<AtomicBool>>,
        mgr: Weak<CatalogTxnManagerInner>,
    ) -> Self {
        Self {
            txn_id,
            start_ts,
            commit_ts_raw: AtomicU64::new(0),
            isolation,
            touched: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            interrupt,
            mgr,
        }
    }

    /// Fails with `Interrupted` once the owning session has been signalled.
    /// Effects recorded before the signal stay pending until commit/abort.
    pub fn check_interrupted(&self) -> CatalogTxnResult<()> {
        if let Some(flag) = &self.interrupt
            && flag.load(Ordering::SeqCst)
        {
            return Err(CatalogTxnError::Interrupted);
        }
        Ok(())
    }

    /// Record writes against a versioned map for batch commit/abort.
    pub fn record_versioned_map_writes<K, V>(
        &self,
        map: &Arc<VersionedMap<K, V>>,
        items: Vec<TouchedItem<K, V>>,
    ) where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
        V: Send + Sync + std::fmt::Debug + 'static,
    {
        let touched = VersionedMapTouched {
            map: Arc::downgrade(map),
            items,
        };
        self.touched
            .lock()
            .expect("poisoned touched mutex")
            .push(Box::new(touched));
    }

    /// Record a single write.
    pub fn record_write<K, V>(
        &self,
        map: &Arc<VersionedMap<K, V>>,
        key: K,
        node: Arc<VersionNode<V>>,
        op: WriteOp,
    ) where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
        V: Send + Sync + std::fmt::Debug + 'static,
    {
        self.record_versioned_map_writes(map, vec![TouchedItem { key, node, op }]);
    }

    pub fn add_hook(&self, hook: Box<dyn TxnHook>) {
        self.hooks.lock().expect("poisoned hooks mutex").push(hook);
    }
}

impl Transaction for CatalogTxn {
    type Error = CatalogTxnError;

    fn txn_id(&self) -> Timestamp {
        self.txn_id
    }

    fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    fn commit_ts(&self) -> Option<Timestamp> {
        decode_commit_ts(self.commit_ts_raw.load(Ordering::SeqCst))
    }

    fn isolation_level(&self) -> &IsolationLevel {
        &self.isolation
    }

    fn commit(&self) -> Result<Timestamp, Self::Error> {
        self.check_interrupted()?;
        {
            let hooks = self.hooks.lock().expect("poisoned hooks mutex");
            for hook in hooks.iter() {
                hook.precommit(self)?;
            }
        }

        let commit_ts = global_timestamp_generator().next()?;

        let touched = self.touched.lock().expect("poisoned touched mutex");
        for set in touched.iter() {
            set.commit(commit_ts)?;
        }

        self.commit_ts_raw
            .store(encode_commit_ts(Some(commit_ts)), Ordering::SeqCst);

        if let Some(mgr) = self.mgr.upgrade() {
            mgr.finish_transaction(self)?;
        }
        Ok(commit_ts)
    }

    fn abort(&self) -> Result<(), Self::Error> {
        let touched = self.touched.lock().expect("poisoned touched mutex");
        for set in touched.iter() {
            set.abort()?;
        }
        if let Some(mgr) = self.mgr.upgrade() {
            mgr.finish_transaction(self)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for CatalogTxn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogTxn")
            .field("txn_id", &self.txn_id)
            .field("start_ts", &self.start_ts)
            .finish()
    }
}
