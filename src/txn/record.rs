//! The per-client transaction record and its on-disk form.

use std::collections::HashMap;

use crate::protocol::Value;
use crate::storage::codec;
use crate::storage::StorageResult;

/// State of one active transaction.
///
/// `reads` maps each key to the value observed at its first read, with Nil
/// marking a key that was absent; commit validates these observations.
/// `writes` holds the pending updates applied on commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxnRecord {
    /// Value observed at the first read of each key (Nil for absent).
    pub reads: HashMap<String, Value>,

    /// Pending updates, applied to storage on commit.
    pub writes: HashMap<String, Value>,

    /// Pre-images of written keys. Carried in the on-disk format for richer
    /// conflict reporting; no current operation populates it.
    pub original_values: HashMap<String, Value>,
}

impl TxnRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the record into the length-prefixed binary form used for
    /// the per-client transaction files.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::encode_map(&self.reads, &mut buf);
        codec::encode_map(&self.writes, &mut buf);
        codec::encode_map(&self.original_values, &mut buf);
        buf
    }

    /// Decodes a record previously produced by [`encode`](Self::encode).
    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        let mut offset = 0;
        let reads = codec::decode_map(data, &mut offset)?;
        let writes = codec::decode_map(data, &mut offset)?;
        let original_values = codec::decode_map(data, &mut offset)?;
        Ok(Self {
            reads,
            writes,
            original_values,
        })
    }
}
