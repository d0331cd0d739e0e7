//! Authenticated identity a dispatcher is bound to

use std::fmt;

use serde::{Deserialize, Serialize};

/// Organization + user pair identifying one logged-in account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Organization id
    pub org_id: String,
    /// User id within the organization
    pub user_id: String,
}

impl UserIdentity {
    /// Identity of `user_id` in `org_id`
    pub fn new(org_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { org_id: org_id.into(), user_id: user_id.into() }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org_id, self.user_id)
    }
}
