//! Identity lookup boundary.
//!
//! The ledger refuses to assign a position to an unknown user, but user
//! identity lives outside this crate. Callers supply a [`MemberDirectory`];
//! the ledger only asks membership questions through it.

use std::collections::HashSet;

/// Answers "is this user id a recognized member?".
pub trait MemberDirectory {
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails (as opposed to the user
    /// simply being unknown).
    fn is_member(&self, user_id: i64) -> anyhow::Result<bool>;
}

/// Set-backed directory for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: HashSet<i64>,
}

impl StaticDirectory {
    /// Build a directory from known member ids.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            members: ids.into_iter().collect(),
        }
    }
}

impl MemberDirectory for StaticDirectory {
    fn is_member(&self, user_id: i64) -> anyhow::Result<bool> {
        Ok(self.members.contains(&user_id))
    }
}

/// Accepts every user id. For deployments where membership is enforced
/// upstream (or for local experimentation via the CLI).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

impl MemberDirectory for OpenDirectory {
    fn is_member(&self, _user_id: i64) -> anyhow::Result<bool> {
        Ok(true)
    }
}
