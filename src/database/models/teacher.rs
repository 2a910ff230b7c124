use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::record::{Descriptor, Field, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub class: String,
    pub subject: String,
}

static DESCRIPTOR: Lazy<Descriptor<Teacher>> = Lazy::new(|| {
    Descriptor::new(
        "teachers",
        vec![
            Field::identifier(|t: &Teacher| t.id, |t, id| t.id = Some(id)),
            Field::text("first_name", |t: &Teacher| t.first_name.as_str(), |t, v| t.first_name = v),
            Field::text("last_name", |t: &Teacher| t.last_name.as_str(), |t, v| t.last_name = v),
            Field::text("email", |t: &Teacher| t.email.as_str(), |t, v| t.email = v).unique(),
            Field::text("class", |t: &Teacher| t.class.as_str(), |t, v| t.class = v),
            Field::text("subject", |t: &Teacher| t.subject.as_str(), |t, v| t.subject = v),
        ],
    )
});

impl Record for Teacher {
    const LABEL: &'static str = "Teacher";

    fn descriptor() -> &'static Descriptor<Self> {
        &DESCRIPTOR
    }
}
