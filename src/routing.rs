//! Routing key computation.
//!
//! The routing key is a best-effort hint telling the driver which replica
//! owns a partition. A single-component partition key routes on the
//! serialized value itself; a composite key concatenates each component as
//! `[u16 length][bytes][0x00]`.

use crate::value::encode::serialize_value;
use crate::value::Value;

/// Routing key for the given partition-key values, or `None` if any value
/// is null or cannot be serialized.
#[must_use]
pub fn routing_key(values: &[Value], protocol_version: u8) -> Option<Vec<u8>> {
    if values.is_empty() || values.iter().any(Value::is_null) {
        return None;
    }
    if let [single] = values {
        return serialize_value(single, protocol_version);
    }

    let mut key = Vec::new();
    for value in values {
        let bytes = serialize_value(value, protocol_version)?;
        let len = u16::try_from(bytes.len()).ok()?;
        key.extend_from_slice(&len.to_be_bytes());
        key.extend_from_slice(&bytes);
        key.push(0);
    }
    Some(key)
}

/// Routing key from the partition-key values found in a statement; a
/// missing component skips the hint.
#[must_use]
pub fn routing_key_for(values: Vec<Option<Value>>, protocol_version: u8) -> Option<Vec<u8>> {
    let values: Vec<Value> = values.into_iter().collect::<Option<_>>()?;
    routing_key(&values, protocol_version)
}
