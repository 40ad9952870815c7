//! Store lock sentinel: a file whose exclusive creation expresses mutual
//! exclusion across every process sharing the backing directory.
//!
//! Acquisition retries indefinitely; a sentinel left behind by a crashed
//! holder therefore blocks all future operations until removed by an
//! operator, which the periodic warning makes visible.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::StorageResult;

/// Backoff between acquisition attempts while another holder exists.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Failed attempts between "still waiting" warnings (about 5 seconds).
const WARN_EVERY: u32 = 500;

/// Exclusive hold on the store, released when dropped.
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Blocks until the sentinel at `path` could be created exclusively.
    pub fn acquire(path: &Path) -> StorageResult<Self> {
        let mut attempts: u32 = 0;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    if attempts > 0 {
                        debug!("Acquired store lock after {} attempt(s)", attempts + 1);
                    }
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts % WARN_EVERY == 0 {
                        warn!(
                            "Still waiting for store lock at {:?} after {} attempts; \
                             a stale sentinel from a crashed holder must be removed manually",
                            path, attempts
                        );
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove store lock sentinel {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_and_drop_removes_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.lock");

        let lock = StoreLock::acquire(&path).unwrap();
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_contender_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.lock");
        let hold = Duration::from_millis(60);

        let lock = StoreLock::acquire(&path).unwrap();
        let contender = {
            let path = path.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let _lock = StoreLock::acquire(&path).unwrap();
                started.elapsed()
            })
        };

        thread::sleep(hold);
        drop(lock);

        let waited = contender.join().unwrap();
        assert!(waited >= Duration::from_millis(40), "waited {:?}", waited);
    }
}
