pub mod constants;
pub mod data_type;
pub mod string;
pub mod timestamp;
pub mod transaction;

pub use timestamp::{
    GlobalTimestampGenerator, Timestamp, TimestampError, TransactionIdGenerator,
    global_timestamp_generator, global_transaction_id_generator,
};
pub use transaction::{IsolationLevel, Transaction};
