use crate::database::store::{Row, TableSchema};
use crate::record::{FieldValue, IDENTIFIER_KEY};

use super::error::FilterError;
use super::types::Condition;

pub struct FilterWhere {
    param_values: Vec<FieldValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self { param_values: vec![], param_index: starting_param_index }
    }

    /// Render `conditions` as a WHERE body. Placeholders start after
    /// `starting_param_index`; an empty condition list yields `1=1`.
    pub fn generate(conditions: &[Condition], starting_param_index: usize) -> (String, Vec<FieldValue>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql_conditions: Vec<String> = conditions
            .iter()
            .map(|c| filter_where.build_sql_condition(c))
            .collect();
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, filter_where.param_values)
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> String {
        let quoted_column = format!("\"{}\"", condition.column);
        match &condition.value {
            FieldValue::NullableText(None) => format!("{} IS NULL", quoted_column),
            value => format!("{} = {}", quoted_column, self.param(value.clone())),
        }
    }

    fn param(&mut self, value: FieldValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    /// In-process evaluation of the same predicate
    pub fn matches(schema: &TableSchema, row: &Row, conditions: &[Condition]) -> Result<bool, FilterError> {
        for condition in conditions {
            let actual = if condition.column == IDENTIFIER_KEY {
                FieldValue::Integer(row.id)
            } else {
                let index = schema
                    .column_index(condition.column)
                    .ok_or_else(|| FilterError::InvalidColumn(condition.column.to_string()))?;
                row.values[index].clone()
            };
            if actual != condition.value {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldKind;
    use crate::database::store::ColumnSpec;

    fn schema() -> TableSchema {
        TableSchema {
            name: "pupils",
            columns: vec![
                ColumnSpec { name: "name", kind: FieldKind::Text, unique: false },
                ColumnSpec { name: "nickname", kind: FieldKind::NullableText, unique: false },
            ],
        }
    }

    #[test]
    fn empty_conditions_match_everything() {
        let (sql, params) = FilterWhere::generate(&[], 0);
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn placeholders_continue_from_start_index() {
        let conditions = vec![
            Condition { column: "name", value: FieldValue::Text("Ada".into()) },
            Condition { column: "nickname", value: FieldValue::NullableText(None) },
            Condition { column: "class", value: FieldValue::Text("9A".into()) },
        ];
        let (sql, params) = FilterWhere::generate(&conditions, 2);
        assert_eq!(sql, "\"name\" = $3 AND \"nickname\" IS NULL AND \"class\" = $4");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn matches_rows_in_memory() {
        let row = Row {
            id: 4,
            values: vec![FieldValue::Text("Ada".into()), FieldValue::NullableText(None)],
        };
        let ada = [Condition { column: "name", value: FieldValue::Text("Ada".into()) }];
        let bob = [Condition { column: "name", value: FieldValue::Text("Bob".into()) }];
        let by_id = [Condition { column: "id", value: FieldValue::Integer(4) }];
        assert!(FilterWhere::matches(&schema(), &row, &ada).unwrap());
        assert!(!FilterWhere::matches(&schema(), &row, &bob).unwrap());
        assert!(FilterWhere::matches(&schema(), &row, &by_id).unwrap());

        let unknown = [Condition { column: "age", value: FieldValue::Text("9".into()) }];
        assert_eq!(
            FilterWhere::matches(&schema(), &row, &unknown),
            Err(FilterError::InvalidColumn("age".into()))
        );
    }
}
