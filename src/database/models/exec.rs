use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::record::{Descriptor, Field, Record};

/// School executive / administrator account.
///
/// Credential and password-reset columns belong to the login flow and are not
/// modelled here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub inactive_status: bool,
    pub user_created_at: Option<String>,
    pub user_updated_at: Option<String>,
}

static DESCRIPTOR: Lazy<Descriptor<Exec>> = Lazy::new(|| {
    Descriptor::new(
        "execs",
        vec![
            Field::identifier(|e: &Exec| e.id, |e, id| e.id = Some(id)),
            Field::text("first_name", |e: &Exec| e.first_name.as_str(), |e, v| e.first_name = v),
            Field::text("last_name", |e: &Exec| e.last_name.as_str(), |e, v| e.last_name = v),
            Field::text("email", |e: &Exec| e.email.as_str(), |e, v| e.email = v).unique(),
            Field::text("username", |e: &Exec| e.username.as_str(), |e, v| e.username = v).unique(),
            Field::text("role", |e: &Exec| e.role.as_str(), |e, v| e.role = v),
            Field::boolean("inactive_status", |e: &Exec| e.inactive_status, |e, v| {
                e.inactive_status = v
            }),
            Field::nullable_text(
                "user_created_at",
                |e: &Exec| e.user_created_at.as_deref(),
                |e, v| e.user_created_at = v,
            ),
            Field::nullable_text(
                "user_updated_at",
                |e: &Exec| e.user_updated_at.as_deref(),
                |e, v| e.user_updated_at = v,
            ),
        ],
    )
});

impl Record for Exec {
    const LABEL: &'static str = "Exec";

    fn descriptor() -> &'static Descriptor<Self> {
        &DESCRIPTOR
    }
}
