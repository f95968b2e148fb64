//! CQL native-protocol serialization of single values.
//!
//! Only used to build routing keys, so the encoding covers the cell formats
//! a partition key can hold plus collections for completeness. Protocol
//! versions below 3 use 16-bit collection lengths; 3 and above use 32-bit.

use crate::value::Value;

/// Serialize a value to its native-protocol byte form.
///
/// Returns `None` for `Value::Null`, which has no serialized body.
#[must_use]
pub fn serialize_value(value: &Value, protocol_version: u8) -> Option<Vec<u8>> {
    let bytes = match value {
        Value::Null => return None,
        Value::Boolean(v) => vec![u8::from(*v)],
        Value::Int(v) => v.to_be_bytes().to_vec(),
        Value::BigInt(v) => v.to_be_bytes().to_vec(),
        Value::Float(v) => v.to_be_bytes().to_vec(),
        Value::Double(v) => v.to_be_bytes().to_vec(),
        Value::Text(v) => v.as_bytes().to_vec(),
        Value::Uuid(v) => v.as_bytes().to_vec(),
        Value::Timestamp(v) => v.timestamp_millis().to_be_bytes().to_vec(),
        Value::Blob(v) => v.clone(),
        Value::List(items) | Value::Set(items) => {
            let mut out = Vec::new();
            write_len(&mut out, items.len(), protocol_version)?;
            for item in items {
                write_element(&mut out, item, protocol_version)?;
            }
            out
        }
        Value::Map(entries) => {
            let mut out = Vec::new();
            write_len(&mut out, entries.len(), protocol_version)?;
            for (k, v) in entries {
                write_element(&mut out, k, protocol_version)?;
                write_element(&mut out, v, protocol_version)?;
            }
            out
        }
    };
    Some(bytes)
}

/// `None` when `len` does not fit the protocol's length field
fn write_len(out: &mut Vec<u8>, len: usize, protocol_version: u8) -> Option<()> {
    if protocol_version >= 3 {
        out.extend_from_slice(&i32::try_from(len).ok()?.to_be_bytes());
    } else {
        out.extend_from_slice(&u16::try_from(len).ok()?.to_be_bytes());
    }
    Some(())
}

fn write_element(out: &mut Vec<u8>, value: &Value, protocol_version: u8) -> Option<()> {
    match serialize_value(value, protocol_version) {
        Some(bytes) => {
            write_len(out, bytes.len(), protocol_version)?;
            out.extend_from_slice(&bytes);
            Some(())
        }
        // null element: length -1 (v3+) has no 16-bit equivalent, write empty
        None if protocol_version >= 3 => {
            out.extend_from_slice(&(-1i32).to_be_bytes());
            Some(())
        }
        None => write_len(out, 0, protocol_version),
    }
}
