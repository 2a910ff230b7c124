pub mod exec;
pub mod student;
pub mod teacher;

pub use exec::Exec;
pub use student::Student;
pub use teacher::Teacher;

use crate::database::store::TableSchema;
use crate::record::Record;

/// Every roster table, in creation order
pub fn all_schemas() -> Vec<&'static TableSchema> {
    vec![
        Teacher::descriptor().schema(),
        Student::descriptor().schema(),
        Exec::descriptor().schema(),
    ]
}
