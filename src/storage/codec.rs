//! Length-prefixed binary encoding for values and key-value maps.
//!
//! The format is shared by the store image and the transaction record
//! files: a map is a little-endian u32 entry count followed by entries of
//! `{u32 key_len, key bytes, value}`, where a value is a tag byte and its
//! payload. Decoding is bounds-checked throughout; a short or malformed
//! buffer is a serialization error, never a panic.

use std::collections::HashMap;

use crate::protocol::Value;

use super::{StorageError, StorageResult};

const TAG_NIL: u8 = 0x00;
const TAG_INTEGER: u8 = 0x01;
const TAG_BOOLEAN: u8 = 0x02;
const TAG_STRING: u8 = 0x03;

/// Appends the encoding of one value to `buf`.
pub fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Nil => buf.push(TAG_NIL),
        Value::Integer(n) => {
            buf.push(TAG_INTEGER);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(*b as u8);
        }
        Value::String(s) => {
            buf.push(TAG_STRING);
            put_bytes(s.as_bytes(), buf);
        }
    }
}

/// Decodes one value starting at `*offset`, advancing it past the payload.
pub fn decode_value(data: &[u8], offset: &mut usize) -> StorageResult<Value> {
    let tag = take_slice(data, offset, 1)?[0];
    match tag {
        TAG_NIL => Ok(Value::Nil),
        TAG_INTEGER => {
            let bytes: [u8; 8] = take_slice(data, offset, 8)?.try_into().unwrap();
            Ok(Value::Integer(i64::from_le_bytes(bytes)))
        }
        TAG_BOOLEAN => {
            let byte = take_slice(data, offset, 1)?[0];
            Ok(Value::Boolean(byte != 0))
        }
        TAG_STRING => Ok(Value::String(take_string(data, offset)?)),
        other => Err(StorageError::Serialization(format!(
            "unknown value tag {:#04x}",
            other
        ))),
    }
}

/// Appends the encoding of a whole key-value map to `buf`.
pub fn encode_map(map: &HashMap<String, Value>, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(map.len() as u32).to_le_bytes());
    for (key, value) in map {
        put_bytes(key.as_bytes(), buf);
        encode_value(value, buf);
    }
}

/// Decodes a whole key-value map starting at `*offset`.
pub fn decode_map(data: &[u8], offset: &mut usize) -> StorageResult<HashMap<String, Value>> {
    let count = take_u32(data, offset)? as usize;
    let mut map = HashMap::new();
    for _ in 0..count {
        let key = take_string(data, offset)?;
        let value = decode_value(data, offset)?;
        map.insert(key, value);
    }
    Ok(map)
}

fn put_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn take_slice<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> StorageResult<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| StorageError::Serialization("truncated image".to_string()))?;
    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}

fn take_u32(data: &[u8], offset: &mut usize) -> StorageResult<u32> {
    let bytes: [u8; 4] = take_slice(data, offset, 4)?.try_into().unwrap();
    Ok(u32::from_le_bytes(bytes))
}

fn take_string(data: &[u8], offset: &mut usize) -> StorageResult<String> {
    let len = take_u32(data, offset)? as usize;
    let bytes = take_slice(data, offset, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| StorageError::Serialization(format!("invalid UTF-8: {}", e)))
}
