//! # linekv: a persistent, transactional key-value store
//!
//! linekv speaks a line-oriented text command protocol (SET, GET, BEGIN,
//! COMMIT, ROLLBACK) over HTTP and applies commands against a durable
//! single-writer store. It provides:
//!
//! - **Typed values**: integers, booleans, strings, and a Nil sentinel,
//!   with parsing and rendering that mirror each other exactly
//! - **Durability**: the whole store is one serialized image, replaced
//!   atomically under an exclusive cross-process lock
//! - **Per-client transactions**: optimistic concurrency with read-set
//!   validation at commit, persisted across crashes
//! - **A faithful wire format**: quoting and escaping rules shared by
//!   responses and errors
//!
//! # Usage
//!
//! ```bash
//! linekv --listen-addr 127.0.0.1:4400 --data-dir ./data
//! ```

// Core modules
pub mod command;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod txn;

// Re-export main types at crate root for convenience
pub use command::{Command, CommandError, CommandProcessor};
pub use protocol::{Outcome, Value};
pub use server::{LinekvServer, ServerConfig};
pub use storage::DurableStore;
pub use txn::TxnManager;
