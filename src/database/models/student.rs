use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::record::{Descriptor, Field, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub class: String,
}

static DESCRIPTOR: Lazy<Descriptor<Student>> = Lazy::new(|| {
    Descriptor::new(
        "students",
        vec![
            Field::identifier(|s: &Student| s.id, |s, id| s.id = Some(id)),
            Field::text("first_name", |s: &Student| s.first_name.as_str(), |s, v| s.first_name = v),
            Field::text("last_name", |s: &Student| s.last_name.as_str(), |s, v| s.last_name = v),
            Field::text("email", |s: &Student| s.email.as_str(), |s, v| s.email = v).unique(),
            Field::text("class", |s: &Student| s.class.as_str(), |s, v| s.class = v),
        ],
    )
});

impl Record for Student {
    const LABEL: &'static str = "Student";

    fn descriptor() -> &'static Descriptor<Self> {
        &DESCRIPTOR
    }
}
