use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Isolation level for transactions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Snapshot isolation - reads see a consistent snapshot
    Snapshot,
    /// Serializable isolation - full serializability
    Serializable,
}

/// Common surface of every transaction object in the system.
pub trait Transaction {
    type Error;

    fn txn_id(&self) -> Timestamp;

    fn start_ts(&self) -> Timestamp;

    fn commit_ts(&self) -> Option<Timestamp>;

    fn isolation_level(&self) -> &IsolationLevel;

    fn commit(&self) -> Result<Timestamp, Self::Error>;

    fn abort(&self) -> Result<(), Self::Error>;
}
