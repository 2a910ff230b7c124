use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::database::store::{ColumnSpec, Row, TableSchema};

use super::error::{json_type_name, RecordError};

/// External key (and column) of the identifier field on every record type
pub const IDENTIFIER_KEY: &str = "id";

/// Declared scalar type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Identifier,
    Text,
    Bool,
    NullableText,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Identifier => "identifier",
            FieldKind::Text => "text",
            FieldKind::Bool => "boolean",
            FieldKind::NullableText => "nullable text",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed column value moving between records and storage
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Bool(bool),
    NullableText(Option<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Identifier,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::NullableText(_) => FieldKind::NullableText,
        }
    }
}

/// Typed getter/setter pair for one struct field
enum Accessor<R> {
    Identifier {
        get: fn(&R) -> Option<i64>,
        set: fn(&mut R, i64),
    },
    Text {
        get: fn(&R) -> &str,
        set: fn(&mut R, String),
    },
    Bool {
        get: fn(&R) -> bool,
        set: fn(&mut R, bool),
    },
    NullableText {
        get: fn(&R) -> Option<&str>,
        set: fn(&mut R, Option<String>),
    },
}

/// One externally addressable field of a record type
pub struct Field<R> {
    key: &'static str,
    column: &'static str,
    unique: bool,
    accessor: Accessor<R>,
}

impl<R> Field<R> {
    pub fn identifier(get: fn(&R) -> Option<i64>, set: fn(&mut R, i64)) -> Self {
        Self::with_accessor(IDENTIFIER_KEY, Accessor::Identifier { get, set })
    }

    pub fn text(key: &'static str, get: fn(&R) -> &str, set: fn(&mut R, String)) -> Self {
        Self::with_accessor(key, Accessor::Text { get, set })
    }

    pub fn boolean(key: &'static str, get: fn(&R) -> bool, set: fn(&mut R, bool)) -> Self {
        Self::with_accessor(key, Accessor::Bool { get, set })
    }

    pub fn nullable_text(
        key: &'static str,
        get: fn(&R) -> Option<&str>,
        set: fn(&mut R, Option<String>),
    ) -> Self {
        Self::with_accessor(key, Accessor::NullableText { get, set })
    }

    fn with_accessor(key: &'static str, accessor: Accessor<R>) -> Self {
        Self { key, column: key, unique: false, accessor }
    }

    /// Store the field under a column name that differs from its external key
    pub fn stored_as(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    /// Storage enforces uniqueness of this column
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn kind(&self) -> FieldKind {
        match self.accessor {
            Accessor::Identifier { .. } => FieldKind::Identifier,
            Accessor::Text { .. } => FieldKind::Text,
            Accessor::Bool { .. } => FieldKind::Bool,
            Accessor::NullableText { .. } => FieldKind::NullableText,
        }
    }

    /// Non-nullable text fields must not be blank on create/replace
    pub fn is_required(&self) -> bool {
        matches!(self.accessor, Accessor::Text { .. })
    }

    pub fn read(&self, record: &R) -> FieldValue {
        match &self.accessor {
            Accessor::Identifier { get, .. } => FieldValue::Integer(get(record).unwrap_or_default()),
            Accessor::Text { get, .. } => FieldValue::Text(get(record).to_string()),
            Accessor::Bool { get, .. } => FieldValue::Bool(get(record)),
            Accessor::NullableText { get, .. } => {
                FieldValue::NullableText(get(record).map(str::to_string))
            }
        }
    }

    /// Set the field from an already-typed value. The value's kind must match.
    pub fn write(&self, record: &mut R, value: FieldValue) -> Result<(), RecordError> {
        match (&self.accessor, value) {
            (Accessor::Identifier { set, .. }, FieldValue::Integer(id)) => set(record, id),
            (Accessor::Text { set, .. }, FieldValue::Text(s)) => set(record, s),
            (Accessor::Bool { set, .. }, FieldValue::Bool(b)) => set(record, b),
            (Accessor::NullableText { set, .. }, FieldValue::NullableText(s)) => set(record, s),
            (_, other) => {
                return Err(RecordError::FieldCoercion {
                    field: self.key.to_string(),
                    expected: self.kind(),
                    found: other.kind().as_str(),
                })
            }
        }
        Ok(())
    }

    /// Convert an untyped request value into this field's declared type
    pub fn coerce(&self, value: &Value) -> Result<FieldValue, RecordError> {
        let coerced = match (self.kind(), value) {
            (FieldKind::Text, Value::String(s)) => Some(FieldValue::Text(s.clone())),
            (FieldKind::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
            (FieldKind::NullableText, Value::String(s)) => {
                Some(FieldValue::NullableText(Some(s.clone())))
            }
            (FieldKind::NullableText, Value::Null) => Some(FieldValue::NullableText(None)),
            _ => None,
        };

        coerced.ok_or_else(|| RecordError::FieldCoercion {
            field: self.key.to_string(),
            expected: self.kind(),
            found: json_type_name(value),
        })
    }
}

/// Static metadata for one record type: external keys, storage columns and
/// declared types, in declaration order.
pub struct Descriptor<R> {
    fields: Vec<Field<R>>,
    identifier: usize,
    schema: TableSchema,
}

impl<R> Descriptor<R> {
    /// Build a descriptor. Panics on a malformed table: an empty field list,
    /// a missing or repeated identifier, duplicate keys/columns, or names that
    /// are not plain SQL identifiers.
    pub fn new(table: &'static str, fields: Vec<Field<R>>) -> Self {
        assert!(is_sql_identifier(table), "invalid table name: {table}");

        let identifiers: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind() == FieldKind::Identifier)
            .map(|(i, _)| i)
            .collect();
        assert!(
            identifiers.len() == 1,
            "{table}: expected exactly one identifier field, found {}",
            identifiers.len()
        );
        assert!(fields.len() > 1, "{table}: descriptor has no data fields");

        let mut keys = HashSet::new();
        let mut columns = HashSet::new();
        for field in &fields {
            assert!(keys.insert(field.key), "{table}: duplicate key '{}'", field.key);
            assert!(columns.insert(field.column), "{table}: duplicate column '{}'", field.column);
            assert!(is_sql_identifier(field.column), "{table}: invalid column '{}'", field.column);
        }

        let schema = TableSchema {
            name: table,
            columns: fields
                .iter()
                .filter(|f| f.kind() != FieldKind::Identifier)
                .map(|f| ColumnSpec { name: f.column, kind: f.kind(), unique: f.unique })
                .collect(),
        };

        Self { identifier: identifiers[0], fields, schema }
    }

    pub fn table(&self) -> &'static str {
        self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// All fields, identifier included, in declaration order
    pub fn fields(&self) -> &[Field<R>] {
        &self.fields
    }

    /// Fields that map to insertable columns (identifier excluded)
    pub fn data_fields(&self) -> impl Iterator<Item = &Field<R>> {
        self.fields.iter().filter(|f| f.kind() != FieldKind::Identifier)
    }

    pub fn identifier(&self) -> &Field<R> {
        &self.fields[self.identifier]
    }

    pub fn field(&self, key: &str) -> Option<&Field<R>> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Values of the insertable columns, aligned with `schema().columns`
    pub fn values(&self, record: &R) -> Vec<FieldValue> {
        self.data_fields().map(|f| f.read(record)).collect()
    }

    pub fn to_row(&self, id: i64, record: &R) -> Row {
        Row { id, values: self.values(record) }
    }

    pub fn from_row(&self, row: Row) -> Result<R, RecordError>
    where
        R: Default,
    {
        let mut record = R::default();
        self.identifier().write(&mut record, FieldValue::Integer(row.id))?;
        for (field, value) in self.data_fields().zip(row.values) {
            field.write(&mut record, value)?;
        }
        Ok(record)
    }

    /// Reject records whose required text fields are empty
    pub fn check_required(&self, record: &R) -> Result<(), RecordError> {
        for field in self.data_fields().filter(|f| f.is_required()) {
            if let FieldValue::Text(s) = field.read(record) {
                if s.trim().is_empty() {
                    return Err(RecordError::BlankField(field.key.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
