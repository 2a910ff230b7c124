use serde_json::{Map, Value};

use super::descriptor::{Descriptor, IDENTIFIER_KEY};
use super::error::RecordError;

/// Whether the identifier key may appear in an incoming payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Bulk patch entries carry their target id
    Allowed,
    /// Create and replace payloads must not pick an id
    Rejected,
}

/// Split a JSON array payload into its raw objects without typed decoding
pub fn parse_batch(payload: Value) -> Result<Vec<Map<String, Value>>, RecordError> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(RecordError::InvalidJson(format!(
                    "element {} is not a JSON object",
                    index
                ))),
            })
            .collect(),
        _ => Err(RecordError::InvalidJson("expected a JSON array".to_string())),
    }
}

/// Split a JSON object payload into its raw key/value map
pub fn parse_object(payload: Value) -> Result<Map<String, Value>, RecordError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(RecordError::InvalidJson("expected a JSON object".to_string())),
    }
}

/// Reject the whole batch if any element uses a key the descriptor does not
/// know. Must run before typed decoding, which would drop unknown keys.
pub fn validate_fields<R>(
    batch: &[Map<String, Value>],
    descriptor: &Descriptor<R>,
    policy: IdentifierPolicy,
) -> Result<(), RecordError> {
    for (index, entry) in batch.iter().enumerate() {
        for key in entry.keys() {
            if key == IDENTIFIER_KEY {
                if policy == IdentifierPolicy::Rejected {
                    return Err(RecordError::SystemFieldNotAllowed(IDENTIFIER_KEY));
                }
                continue;
            }
            if !descriptor.contains_key(key) {
                tracing::warn!(
                    "Rejecting {} payload: unknown field '{}' in element {}",
                    descriptor.table(),
                    key,
                    index
                );
                return Err(RecordError::UnknownField { field: key.clone() });
            }
        }
    }
    Ok(())
}
