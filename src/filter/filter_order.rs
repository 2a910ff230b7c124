use std::cmp::Ordering;

use crate::database::store::{Row, TableSchema};
use crate::record::{FieldValue, IDENTIFIER_KEY};

use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        // ties (and unsorted listings) fall back to insertion order
        if !infos.iter().any(|i| i.column == IDENTIFIER_KEY) {
            parts.push(format!("\"{}\" ASC", IDENTIFIER_KEY));
        }
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-process ordering matching `generate`: NULLs sort as the largest value
    pub fn compare(schema: &TableSchema, infos: &[FilterOrderInfo], a: &Row, b: &Row) -> Ordering {
        for info in infos {
            let ordering = match schema.column_index(info.column) {
                Some(i) => compare_values(&a.values[i], &b.values[i]),
                None if info.column == IDENTIFIER_KEY => a.id.cmp(&b.id),
                None => Ordering::Equal,
            };
            let ordering = match info.sort {
                super::SortDirection::Asc => ordering,
                super::SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::NullableText(x), FieldValue::NullableText(y)) => match (x, y) {
            (Some(x), Some(y)) => x.cmp(y),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
        },
        _ => Ordering::Equal,
    }
}
