//! Transaction engine: per-client read/write sets with optimistic
//! validation at commit.
//!
//! Each client holds at most one transaction at a time. A transaction
//! buffers writes and records the first observation of every key it reads;
//! commit revalidates those observations against the committed store and
//! applies the buffered writes one by one. Records are persisted to
//! per-client files after every mutating operation, so a crash leaves the
//! transaction active rather than lost.

pub mod manager;
pub mod record;

pub use manager::TxnManager;
pub use record::TxnRecord;

use thiserror::Error;

use crate::storage::StorageError;

/// Transaction engine errors. The display text of the protocol-level
/// variants is exactly what reaches the wire.
#[derive(Debug, Error)]
pub enum TxnError {
    /// BEGIN issued by a client already in a transaction.
    #[error("Already in transaction")]
    AlreadyInTransaction,

    /// COMMIT issued by a client with no active transaction.
    #[error("no_transaction")]
    NoTransaction,

    /// ROLLBACK issued by a client with no active transaction.
    #[error("No active transaction")]
    NoActiveTransaction,

    /// A read-set key had a different committed value at commit time.
    #[error("Atomicity failure ({0})")]
    AtomicityFailure(String),

    /// Client id unusable as a transaction-record file name.
    #[error("Invalid command")]
    InvalidClientId(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type TxnResult<T> = Result<T, TxnError>;
