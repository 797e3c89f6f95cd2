//! Key encoding for documents and index entries.
//!
//! All encodings are order-preserving under byte comparison, so sled range
//! scans return documents in id order and index entries in value order.

use std::ops::Bound;

use boxstore_proto::Value;

/// Size of an encoded document id.
pub const ID_KEY_SIZE: usize = 8;

/// Separator between the parts of an index entry key.
const SEPARATOR: u8 = 0x00;

/// Encode a document id.
///
/// Big-endian with the sign bit flipped, so negative ids sort first.
pub fn encode_id(id: i64) -> [u8; ID_KEY_SIZE] {
    ((id as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

/// Decode a document id.
pub fn decode_id(bytes: &[u8]) -> Option<i64> {
    let bytes: [u8; ID_KEY_SIZE] = bytes.try_into().ok()?;
    Some((u64::from_be_bytes(bytes) ^ 0x8000_0000_0000_0000) as i64)
}

/// Type tag for a value. Values of different types never compare equal.
fn type_tag(value: &Value) -> u8 {
    match value {
        Value::Null => 0x00,
        Value::Bool(_) => 0x01,
        Value::Int64(_) => 0x03,
        Value::Float64(_) => 0x05,
        Value::String(_) => 0x06,
        Value::Timestamp(_) => 0x08,
        Value::Bytes(_) => 0x09,
    }
}

/// Encode a value in a sortable format into `buf`.
///
/// - Integers and timestamps: big-endian with the sign bit flipped
/// - Floats: IEEE 754 bits adjusted so byte order matches numeric order
/// - Strings and bytes: raw bytes (lexicographic order)
pub fn encode_value_sortable_into(value: &Value, buf: &mut Vec<u8>) {
    buf.push(type_tag(value));
    match value {
        Value::Null => {}
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Int64(n) | Value::Timestamp(n) => {
            let sortable = (*n as u64) ^ 0x8000_0000_0000_0000;
            buf.extend_from_slice(&sortable.to_be_bytes());
        }
        Value::Float64(n) => {
            let bits = n.to_bits();
            let sortable = if (bits & 0x8000_0000_0000_0000) != 0 {
                !bits
            } else {
                bits ^ 0x8000_0000_0000_0000
            };
            buf.extend_from_slice(&sortable.to_be_bytes());
        }
        Value::String(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Bytes(b) => buf.extend_from_slice(b),
    }
}

/// Prefix shared by every entry of one index.
///
/// Format: `[index_name][0x00]`
pub fn index_prefix(index_name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(index_name.len() + 1);
    key.extend_from_slice(index_name.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Prefix shared by every entry of one index with one value.
///
/// Format: `[index_name][0x00][encoded_value][0x00]`
pub fn index_value_prefix(index_name: &str, value: &Value) -> Vec<u8> {
    let mut key = index_prefix(index_name);
    encode_value_sortable_into(value, &mut key);
    key.push(SEPARATOR);
    key
}

/// Full key of an index entry.
///
/// Format: `[index_name][0x00][encoded_value][0x00][id:8]`
pub fn index_entry_key(index_name: &str, value: &Value, id: i64) -> Vec<u8> {
    let mut key = index_value_prefix(index_name, value);
    key.extend_from_slice(&encode_id(id));
    key
}

/// Extract the document id from an index entry key.
pub fn index_entry_id(key: &[u8]) -> Option<i64> {
    if key.len() < ID_KEY_SIZE {
        return None;
    }
    decode_id(&key[key.len() - ID_KEY_SIZE..])
}

/// Key bounds covering index entries with `gte <= value <= lte`.
///
/// A missing bound is open on that side but stays within the type of the
/// other bound. Returns `None` when both bounds are missing or their types
/// differ, since no index range expresses that.
pub fn index_range_bounds(
    index_name: &str,
    gte: Option<&Value>,
    lte: Option<&Value>,
) -> Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)> {
    let tag = match (gte, lte) {
        (Some(lo), Some(hi)) if type_tag(lo) == type_tag(hi) => type_tag(lo),
        (Some(_), Some(_)) | (None, None) => return None,
        (Some(v), None) | (None, Some(v)) => type_tag(v),
    };

    let start = match gte {
        Some(lo) => {
            let mut key = index_value_prefix(index_name, lo);
            key.extend_from_slice(&[0x00; ID_KEY_SIZE]);
            Bound::Included(key)
        }
        None => {
            let mut key = index_prefix(index_name);
            key.push(tag);
            Bound::Included(key)
        }
    };

    let end = match lte {
        Some(hi) => {
            let mut key = index_value_prefix(index_name, hi);
            key.extend_from_slice(&[0xFF; ID_KEY_SIZE]);
            Bound::Included(key)
        }
        None => {
            let mut key = index_prefix(index_name);
            key.push(tag + 1);
            Bound::Excluded(key)
        }
    };

    Some((start, end))
}

/// Current time in microseconds since the Unix epoch.
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or_default()
}
