//! The verified caller identity attached to every authenticated request.

use serde::{Deserialize, Serialize};

/// Username used for every request when authentication is disabled.
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// A caller identity that has already been verified upstream.
///
/// Produced exactly once per request by the auth middleware; handlers only
/// ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }

    /// The identity used when auth is disabled.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USERNAME, false)
    }

    /// Whether this caller may modify a file uploaded by `uploader`.
    pub fn may_modify(&self, uploader: &str) -> bool {
        self.is_admin || self.username == uploader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_may_modify() {
        let owner = Identity::new("ana", false);
        let admin = Identity::new("root", true);
        let other = Identity::new("bo", false);

        assert!(owner.may_modify("ana"));
        assert!(admin.may_modify("ana"));
        assert!(!other.may_modify("ana"));
    }

    #[test]
    fn anonymous_is_not_admin() {
        let anon = Identity::anonymous();
        assert_eq!(anon.username, ANONYMOUS_USERNAME);
        assert!(!anon.is_admin);
    }
}
