use serde::Serialize;

use warden_core::UserId;

use crate::Role;

/// Resolved caller of a single request.
///
/// Built by the authentication filter from a verified access token (or by the
/// login flow from a stored account) and dropped when the request completes.
/// It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    user_id: UserId,
    username: String,
    role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The single granted authority (equal to the role string).
    pub fn authority(&self) -> &'static str {
        self.role.as_str()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
