//! Current-user lookup.

use crate::error::{EngineError, EngineResult};
use crate::model::template::UserId;

/// Source of the signed-in user for the current session.
pub trait IdentityProvider {
    /// Returns the signed-in user, or `None` when nobody is signed in.
    fn current_user_id(&self) -> Option<UserId>;
}

/// Resolves the current user or fails with `Unauthenticated`.
pub fn require_user<I: IdentityProvider + ?Sized>(identity: &I) -> EngineResult<UserId> {
    identity
        .current_user_id()
        .ok_or(EngineError::Unauthenticated)
}

/// Fixed identity, set once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticIdentity {
    user_id: Option<UserId>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
