use crate::record::{Descriptor, FieldKind, FieldValue};

use super::error::FilterError;
use super::types::{Condition, FilterOrderInfo, ListFilter, SortDirection};

/// Query parameter carrying `field:asc|desc`; may repeat
pub const SORT_PARAM: &str = "sortby";

pub struct Filter;

impl Filter {
    /// Build a listing filter from raw query parameters.
    ///
    /// - `field=value` on a text or boolean field adds an equality condition;
    ///   empty values are ignored
    /// - `sortby=field:dir` adds an ordering key; malformed entries, unknown
    ///   fields and directions other than `asc`/`desc` are skipped
    /// - any other parameter is ignored
    pub fn from_params<R>(
        descriptor: &Descriptor<R>,
        params: &[(String, String)],
    ) -> Result<ListFilter, FilterError> {
        let mut filter = ListFilter::default();

        for (key, value) in params {
            if key == SORT_PARAM {
                if let Some(info) = Self::parse_sort(descriptor, value) {
                    filter.order.push(info);
                }
                continue;
            }
            if value.is_empty() {
                continue;
            }
            let Some(field) = descriptor.field(key) else {
                continue;
            };
            let value = match field.kind() {
                FieldKind::Text => FieldValue::Text(value.clone()),
                FieldKind::Bool => match value.as_str() {
                    "true" => FieldValue::Bool(true),
                    "false" => FieldValue::Bool(false),
                    _ => {
                        return Err(FilterError::InvalidValue {
                            field: key.clone(),
                            value: value.clone(),
                        })
                    }
                },
                FieldKind::NullableText => FieldValue::NullableText(Some(value.clone())),
                FieldKind::Identifier => continue,
            };
            filter.conditions.push(Condition { column: field.column(), value });
        }

        Ok(filter)
    }

    fn parse_sort<R>(descriptor: &Descriptor<R>, param: &str) -> Option<FilterOrderInfo> {
        let (key, dir) = param.split_once(':')?;
        if dir.contains(':') {
            return None;
        }
        let sort = SortDirection::parse(dir)?;
        let field = descriptor.field(key)?;
        Some(FilterOrderInfo { column: field.column(), sort })
    }
}
