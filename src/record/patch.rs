use serde_json::{Map, Value};

use super::descriptor::IDENTIFIER_KEY;
use super::error::RecordError;
use super::Record;

/// Apply `updates` to a copy of `existing`, coercing every value into the
/// declared type of its field. `existing` is never touched; on any failure
/// the copy is discarded.
///
/// The identifier key is skipped: ids are immutable and travel separately.
/// Unknown keys fail with [`RecordError::UnknownField`], matching the
/// whitelist, so a caller that forgets the whitelist still cannot drop
/// fields silently.
pub fn apply_patch<R: Record>(existing: &R, updates: &Map<String, Value>) -> Result<R, RecordError> {
    let descriptor = R::descriptor();
    let mut patched = existing.clone();

    for (key, value) in updates {
        if key == IDENTIFIER_KEY {
            continue;
        }
        let field = descriptor
            .field(key)
            .ok_or_else(|| RecordError::UnknownField { field: key.clone() })?;
        let coerced = field.coerce(value)?;
        field.write(&mut patched, coerced)?;
    }

    Ok(patched)
}

/// Build a fresh record from a full payload (create/replace)
pub fn build_record<R: Record>(values: &Map<String, Value>) -> Result<R, RecordError> {
    let record = apply_patch(&R::default(), values)?;
    R::descriptor().check_required(&record)?;
    Ok(record)
}
