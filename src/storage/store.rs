//! The durable store: a whole-map image file behind the store lock.
//!
//! Reads and writes both run under exclusive access, one operation at a
//! time. A write re-reads the current image, applies the single update,
//! and swaps a freshly fsynced file into place, so a crash never leaves a
//! half-written image. An unreadable image degrades to an empty store; a
//! readable but undecodable one is surfaced as corruption.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::protocol::Value;

use super::codec;
use super::lock::StoreLock;
use super::StorageResult;

/// File holding the serialized whole-store map.
const STORE_FILE: &str = "storage.dat";

/// Lock sentinel file.
const LOCK_FILE: &str = "storage.lock";

/// Scratch file a write prepares before renaming it over the image.
const SCRATCH_FILE: &str = "storage.dat.tmp";

/// A durable key-value map backed by a single file.
pub struct DurableStore {
    data_path: PathBuf,
    scratch_path: PathBuf,
    lock_path: PathBuf,

    /// Serializes threads of this process before they compete on the
    /// filesystem sentinel.
    local: Mutex<()>,
}

impl DurableStore {
    /// Opens (creating if needed) the store rooted at `data_dir`.
    pub fn open(data_dir: &Path) -> StorageResult<Arc<Self>> {
        fs::create_dir_all(data_dir)?;
        info!("Opened durable store at {:?}", data_dir);
        Ok(Arc::new(Self {
            data_path: data_dir.join(STORE_FILE),
            scratch_path: data_dir.join(SCRATCH_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            local: Mutex::new(()),
        }))
    }

    /// Returns the committed value for `key`, if any.
    pub fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let _local = self.local.lock();
        let _lock = StoreLock::acquire(&self.lock_path)?;
        let map = self.read_map()?;
        Ok(map.get(key).cloned())
    }

    /// Stores `value` under `key`, returning the previous committed value.
    pub fn set(&self, key: &str, value: Value) -> StorageResult<Option<Value>> {
        let _local = self.local.lock();
        let _lock = StoreLock::acquire(&self.lock_path)?;
        let mut map = self.read_map()?;
        let old = map.insert(key.to_string(), value);
        self.write_map(&map)?;
        debug!("Committed write for key {:?}", key);
        Ok(old)
    }

    /// Loads the current store image. A missing or unreadable file is an
    /// empty store; a malformed image propagates as corruption.
    fn read_map(&self) -> StorageResult<HashMap<String, Value>> {
        let bytes = match fs::read(&self.data_path) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(HashMap::new()),
        };
        let mut offset = 0;
        codec::decode_map(&bytes, &mut offset)
    }

    /// Serializes the full map and atomically replaces the store image.
    fn write_map(&self, map: &HashMap<String, Value>) -> StorageResult<()> {
        let mut buf = Vec::new();
        codec::encode_map(map, &mut buf);

        let mut file = fs::File::create(&self.scratch_path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.scratch_path, &self.data_path)?;
        Ok(())
    }
}
