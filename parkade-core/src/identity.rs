use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Who is asking, as vouched for by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl Requester {
    pub fn user(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            role: Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners see their own bookings; admins see everything.
    pub fn can_access(&self, owner_email: &str) -> bool {
        self.is_admin() || self.email.eq_ignore_ascii_case(owner_email)
    }
}
