use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::database::store::TableSchema;
use crate::filter::{FilterOrder, FilterWhere, ListFilter, SqlResult};
use crate::record::{FieldKind, FieldValue, IDENTIFIER_KEY};

/// Generates parameterised Postgres statements for one table
pub struct QueryBuilder<'a> {
    schema: &'a TableSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self { schema }
    }

    fn column_list(&self) -> String {
        std::iter::once(IDENTIFIER_KEY)
            .chain(self.schema.columns.iter().map(|c| c.name))
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn select(&self, filter: &ListFilter) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&filter.conditions, 0);
        let query = format!(
            "SELECT {} FROM {} WHERE {} {}",
            self.column_list(),
            quote_identifier(self.schema.name),
            where_clause,
            FilterOrder::generate(&filter.order)
        );
        SqlResult { query, params }
    }

    pub fn count(&self, filter: &ListFilter) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&filter.conditions, 0);
        let query = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {}",
            quote_identifier(self.schema.name),
            where_clause
        );
        SqlResult { query, params }
    }

    pub fn fetch(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.column_list(),
            quote_identifier(self.schema.name),
            quote_identifier(IDENTIFIER_KEY)
        )
    }

    pub fn insert(&self) -> String {
        let columns: Vec<String> = self.schema.columns.iter().map(|c| quote_identifier(c.name)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote_identifier(self.schema.name),
            columns.join(", "),
            placeholders.join(", "),
            quote_identifier(IDENTIFIER_KEY)
        )
    }

    /// Column values bind as `$1..$n`, the identifier as `$n+1`
    pub fn update(&self) -> String {
        let assignments: Vec<String> = self
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", quote_identifier(c.name), i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            quote_identifier(self.schema.name),
            assignments.join(", "),
            quote_identifier(IDENTIFIER_KEY),
            self.schema.columns.len() + 1
        )
    }

    pub fn delete(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_identifier(self.schema.name),
            quote_identifier(IDENTIFIER_KEY)
        )
    }

    pub fn create_table(&self) -> String {
        let mut definitions = vec![format!("{} BIGSERIAL PRIMARY KEY", quote_identifier(IDENTIFIER_KEY))];
        for column in &self.schema.columns {
            let ty = match column.kind {
                FieldKind::Identifier => "BIGINT NOT NULL",
                FieldKind::Text => "TEXT NOT NULL DEFAULT ''",
                FieldKind::Bool => "BOOLEAN NOT NULL DEFAULT FALSE",
                FieldKind::NullableText => "TEXT",
            };
            let unique = if column.unique { " UNIQUE" } else { "" };
            definitions.push(format!("{} {}{}", quote_identifier(column.name), ty, unique));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(self.schema.name),
            definitions.join(", ")
        )
    }
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn bind_value<'q>(q: Query<'q, Postgres, PgArguments>, v: &FieldValue) -> Query<'q, Postgres, PgArguments> {
    match v {
        FieldValue::Integer(i) => q.bind(*i),
        FieldValue::Text(s) => q.bind(s.clone()),
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::NullableText(s) => q.bind(s.clone()),
    }
}
