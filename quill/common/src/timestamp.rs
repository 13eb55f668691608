//! Timestamp and transaction-id management for MVCC visibility.
//!
//! Commit timestamps and transaction ids share one `u64` space split in two
//! domains: commit timestamps occupy the lower half, transaction ids start
//! at `1 << 63`. A version tagged with a transaction id is uncommitted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("commit timestamp overflow: {0}")]
    CommitTsOverflow(u64),
    #[error("transaction id overflow: {0}")]
    TxnIdOverflow(u64),
}

/// A point in the global commit order, or a transaction id when the top bit
/// is set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// First value of the transaction-id domain.
    pub const TXN_ID_START: u64 = 1 << 63;

    #[inline]
    pub fn with_ts(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Whether this value lives in the transaction-id domain.
    #[inline]
    pub fn is_txn_id(&self) -> bool {
        self.0 >= Self::TXN_ID_START
    }
}

impl From<Timestamp> for u64 {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Monotone generator for commit timestamps.
pub struct GlobalTimestampGenerator {
    counter: AtomicU64,
}

impl GlobalTimestampGenerator {
    /// Starts at 1; 0 is reserved as "never committed".
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> Result<Timestamp, TimestampError> {
        let raw = self.counter.fetch_add(1, Ordering::SeqCst);
        if raw >= Timestamp::TXN_ID_START {
            return Err(TimestampError::CommitTsOverflow(raw));
        }
        Ok(Timestamp(raw))
    }

    pub fn current(&self) -> Timestamp {
        Timestamp(self.counter.load(Ordering::SeqCst))
    }

    /// Advance the counter when a larger timestamp is observed elsewhere.
    pub fn update_if_greater(&self, ts: Timestamp) -> Result<(), TimestampError> {
        if ts.raw() >= Timestamp::TXN_ID_START {
            return Err(TimestampError::CommitTsOverflow(ts.raw()));
        }
        self.counter.fetch_max(ts.raw() + 1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for GlobalTimestampGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotone generator for transaction ids (upper domain).
pub struct TransactionIdGenerator {
    counter: AtomicU64,
}

impl TransactionIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(Timestamp::TXN_ID_START + 1),
        }
    }

    pub fn next(&self) -> Result<Timestamp, TimestampError> {
        let raw = self.counter.fetch_add(1, Ordering::SeqCst);
        if raw == u64::MAX {
            return Err(TimestampError::TxnIdOverflow(raw));
        }
        Ok(Timestamp(raw))
    }

    pub fn update_if_greater(&self, id: Timestamp) -> Result<(), TimestampError> {
        if id.raw() == u64::MAX {
            return Err(TimestampError::TxnIdOverflow(id.raw()));
        }
        self.counter.fetch_max(id.raw() + 1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_TIMESTAMP_GENERATOR: OnceLock<Arc<GlobalTimestampGenerator>> = OnceLock::new();
static GLOBAL_TXN_ID_GENERATOR: OnceLock<Arc<TransactionIdGenerator>> = OnceLock::new();

pub fn global_timestamp_generator() -> Arc<GlobalTimestampGenerator> {
    GLOBAL_TIMESTAMP_GENERATOR
        .get_or_init(|| Arc::new(GlobalTimestampGenerator::new()))
        .clone()
}

pub fn global_transaction_id_generator() -> Arc<TransactionIdGenerator> {
    GLOBAL_TXN_ID_GENERATOR
        .get_or_init(|| Arc::new(TransactionIdGenerator::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_ts_domain() {
        let generator = GlobalTimestampGenerator::new();
        let ts = generator.next().unwrap();
        assert_eq!(ts.raw(), 1);
        assert!(!ts.is_txn_id());
    }

    #[test]
    fn txn_id_domain() {
        let generator = TransactionIdGenerator::new();
        let id = generator.next().unwrap();
        assert!(id.raw() > Timestamp::TXN_ID_START);
        assert!(id.is_txn_id());
    }

    #[test]
    fn update_if_greater_advances() {
        let generator = GlobalTimestampGenerator::new();
        generator.update_if_greater(Timestamp::with_ts(41)).unwrap();
        assert_eq!(generator.next().unwrap().raw(), 42);
    }
}
