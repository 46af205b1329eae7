//! In-process PermissionChecker backed by a static grant set.
//!
//! Group administration lives in the admin console outside this crate; the
//! deployment wires granted user ids in at startup. Tests use the same
//! adapter.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::UserId;
use crate::ports::{PermissionChecker, PermissionError};

#[derive(Debug, Clone, Default)]
pub struct StaticPermissionChecker {
    grants: HashSet<(UserId, String)>,
    allow_all: bool,
}

impl StaticPermissionChecker {
    /// No grants at all.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Every permission granted to every user.
    pub fn allow_all() -> Self {
        Self {
            grants: HashSet::new(),
            allow_all: true,
        }
    }

    /// Grants one permission to one user.
    pub fn grant(mut self, user_id: UserId, permission: &str) -> Self {
        self.grants.insert((user_id, permission.to_string()));
        self
    }
}

#[async_trait]
impl PermissionChecker for StaticPermissionChecker {
    async fn has_permission(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> Result<bool, PermissionError> {
        Ok(self.allow_all || self.grants.contains(&(user_id, permission.to_string())))
    }
}
