use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter value for '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),
}
