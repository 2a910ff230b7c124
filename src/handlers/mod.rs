pub mod records;
pub mod root;
pub mod teachers;
