//! The transaction manager: registry, persistence, and commit validation.
//!
//! The manager fronts the durable store for every data operation. Outside a
//! transaction, get and set pass straight through; inside one, they work
//! against the client's record. The in-memory registry is a cache over the
//! record files under `transactions/`, which remain the durable source of
//! truth: records are reloaded at startup and on registry misses, so a
//! transaction survives a crash or a process handover.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::protocol::Value;
use crate::storage::{DurableStore, StorageError};

use super::record::TxnRecord;
use super::{TxnError, TxnResult};

/// Directory under the data dir holding per-client record files.
const TXN_DIR: &str = "transactions";

/// Extension of per-client record files.
const TXN_EXT: &str = "transaction";

/// Coordinates every client's transaction state against one store.
pub struct TxnManager {
    store: Arc<DurableStore>,
    txn_dir: PathBuf,

    /// Active transactions by client id; a cache over the record files.
    records: DashMap<String, TxnRecord>,
}

impl TxnManager {
    /// Opens the manager rooted at `data_dir`, reloading any in-flight
    /// transaction records left by a previous process.
    pub fn open(data_dir: &Path, store: Arc<DurableStore>) -> TxnResult<Arc<Self>> {
        let txn_dir = data_dir.join(TXN_DIR);
        fs::create_dir_all(&txn_dir).map_err(StorageError::from)?;

        let manager = Arc::new(Self {
            store,
            txn_dir,
            records: DashMap::new(),
        });
        manager.recover();
        Ok(manager)
    }

    /// Starts a transaction for `client`.
    pub fn begin(&self, client: &str) -> TxnResult<()> {
        Self::validate_client(client)?;
        if self.is_active(client) {
            return Err(TxnError::AlreadyInTransaction);
        }
        let record = TxnRecord::new();
        self.persist(client, &record)?;
        self.records.insert(client.to_string(), record);
        debug!("Client {:?} began a transaction", client);
        Ok(())
    }

    /// Validates the read set and applies the write set.
    ///
    /// Validation reads each observed key back through the store; the first
    /// key whose committed value differs aborts the commit, and the record
    /// is retained so the client can still roll back. On success the writes
    /// are applied one by one (each individually atomic, the group not) and
    /// the record is destroyed.
    pub fn commit(&self, client: &str) -> TxnResult<()> {
        Self::validate_client(client)?;
        if !self.is_active(client) {
            return Err(TxnError::NoTransaction);
        }
        // Clone out of the registry so no shard lock is held across store I/O.
        let record = match self.records.get(client) {
            Some(record) => record.value().clone(),
            None => return Err(TxnError::NoTransaction),
        };

        for (key, observed) in &record.reads {
            let current = Value::from(self.store.get(key)?);
            if current != *observed {
                debug!(
                    "Commit validation failed for client {:?} on key {:?}",
                    client, key
                );
                return Err(TxnError::AtomicityFailure(key.clone()));
            }
        }

        for (key, value) in &record.writes {
            self.store.set(key, value.clone())?;
        }

        self.records.remove(client);
        self.remove_record_file(client);
        debug!(
            "Client {:?} committed {} write(s)",
            client,
            record.writes.len()
        );
        Ok(())
    }

    /// Discards the client's transaction without touching the store.
    pub fn rollback(&self, client: &str) -> TxnResult<()> {
        Self::validate_client(client)?;
        if !self.is_active(client) {
            return Err(TxnError::NoActiveTransaction);
        }
        self.records.remove(client);
        self.remove_record_file(client);
        debug!("Client {:?} rolled back", client);
        Ok(())
    }

    /// Reads `key` on behalf of `client`.
    ///
    /// Inside a transaction a pending write wins; otherwise the committed
    /// value is returned and the first such observation is recorded into
    /// the read set. Without a transaction this is a plain store read.
    pub fn get(&self, client: &str, key: &str) -> TxnResult<Option<Value>> {
        Self::validate_client(client)?;
        if !self.is_active(client) {
            return Ok(self.store.get(key)?);
        }

        if let Some(record) = self.records.get(client) {
            if let Some(pending) = record.writes.get(key) {
                return Ok(Some(pending.clone()));
            }
        }

        let observed = self.store.get(key)?;
        if let Some(mut record) = self.records.get_mut(client) {
            if !record.reads.contains_key(key) && !record.writes.contains_key(key) {
                record
                    .reads
                    .insert(key.to_string(), Value::from(observed.clone()));
                self.persist(client, &record)?;
            }
        }
        Ok(observed)
    }

    /// Writes `key` on behalf of `client`, returning the previous value.
    ///
    /// Inside a transaction the write is buffered and the reported previous
    /// value is the *committed* one, read fresh from the store. Without a
    /// transaction this is a plain store write.
    pub fn set(&self, client: &str, key: &str, value: Value) -> TxnResult<Option<Value>> {
        Self::validate_client(client)?;
        if !self.is_active(client) {
            return Ok(self.store.set(key, value)?);
        }

        let old = self.store.get(key)?;
        if let Some(mut record) = self.records.get_mut(client) {
            record.writes.insert(key.to_string(), value);
            self.persist(client, &record)?;
        }
        Ok(old)
    }

    /// Rejects client ids that cannot safely name a record file. The id is
    /// caller-supplied and unauthenticated; a path separator or parent
    /// component would place the record outside the transactions directory.
    fn validate_client(client: &str) -> TxnResult<()> {
        if client == ".." || client.contains(['/', '\\', '\0']) {
            return Err(TxnError::InvalidClientId(client.to_string()));
        }
        Ok(())
    }

    /// Whether `client` has an active transaction, consulting the record
    /// file when the registry has no entry.
    fn is_active(&self, client: &str) -> bool {
        if self.records.contains_key(client) {
            return true;
        }
        let path = self.record_path(client);
        let Ok(bytes) = fs::read(&path) else {
            return false;
        };
        match TxnRecord::decode(&bytes) {
            Ok(record) => {
                self.records.insert(client.to_string(), record);
                true
            }
            Err(e) => {
                warn!("Ignoring undecodable transaction record {:?}: {}", path, e);
                false
            }
        }
    }

    /// Reloads every record file into the registry.
    fn recover(&self) {
        let entries = match fs::read_dir(&self.txn_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let mut recovered = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TXN_EXT) {
                continue;
            }
            let Some(client) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read(&path).map_err(StorageError::from).and_then(|bytes| TxnRecord::decode(&bytes)) {
                Ok(record) => {
                    self.records.insert(client.to_string(), record);
                    recovered += 1;
                }
                Err(e) => warn!("Skipping undecodable transaction record {:?}: {}", path, e),
            }
        }
        if recovered > 0 {
            info!("Recovered {} in-flight transaction(s)", recovered);
        }
    }

    fn record_path(&self, client: &str) -> PathBuf {
        // The join cannot escape txn_dir: validate_client has already
        // rejected separators and parent components.
        self.txn_dir.join(format!("{}.{}", client, TXN_EXT))
    }

    /// Flushes the record to its per-client file. Called after every
    /// mutating operation so a crash leaves the transaction active.
    fn persist(&self, client: &str, record: &TxnRecord) -> TxnResult<()> {
        fs::write(self.record_path(client), record.encode()).map_err(StorageError::from)?;
        Ok(())
    }

    fn remove_record_file(&self, client: &str) {
        let path = self.record_path(client);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove transaction record {:?}: {}", path, e);
            }
        }
    }
}
