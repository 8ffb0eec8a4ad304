use crate::{auth::repo_types::User, error::AppError};

/// The acting user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Resolved identity for one request. Never stored beyond it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(Principal),
}

impl Identity {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Anonymous => None,
            Identity::User(p) => Some(p),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.principal().map(|p| p.id)
    }

    /// Fails with `Unauthenticated` for anonymous callers.
    pub fn require_authenticated(&self) -> Result<&Principal, AppError> {
        self.principal().ok_or(AppError::Unauthenticated)
    }
}
