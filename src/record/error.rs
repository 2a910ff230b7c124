use serde_json::Value;

use super::descriptor::FieldKind;

/// Errors raised while mapping request payloads onto records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(&'static str),

    #[error("Invalid request payload: {0}")]
    InvalidJson(String),

    #[error("Unacceptable field '{field}' found in request. Only use allowed fields.")]
    UnknownField { field: String },

    #[error("Cannot assign {found} to field '{field}' of type {expected}")]
    FieldCoercion {
        field: String,
        expected: FieldKind,
        found: &'static str,
    },

    #[error("All fields are required: '{0}' is blank")]
    BlankField(String),
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
