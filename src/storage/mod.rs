//! Durable storage: a single serialized store image under an exclusive lock.
//!
//! The whole key-value map lives in one binary file. Every operation takes
//! the store lock, reads the current image, and (for writes) replaces it
//! atomically, so operations are linearizable across every process sharing
//! the backing directory:
//!
//! - `storage.dat`: length-prefixed serialization of the entire map
//! - `storage.lock`: existence-is-lock sentinel, removed on release

pub mod codec;
pub mod lock;
pub mod store;

pub use lock::StoreLock;
pub use store::DurableStore;

use thiserror::Error;

/// Storage engine errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
