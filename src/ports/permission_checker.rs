//! PermissionChecker port - the one permission question the core asks.
//!
//! Group and permission administration lives outside this crate; the engine
//! only needs "does this user hold permission P".

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::UserId;

/// Permission gating the regenerate-question and regenerate-summary paths.
pub const REGENERATE_PERMISSION: &str = "regenerate_summary_question";

#[derive(Debug, Clone, Error)]
pub enum PermissionError {
    #[error("permission lookup failed: {0}")]
    Lookup(String),
}

/// Port for checking a user's permissions.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Whether the user holds the named permission.
    async fn has_permission(
        &self,
        user_id: UserId,
        permission: &str,
    ) -> Result<bool, PermissionError>;
}
