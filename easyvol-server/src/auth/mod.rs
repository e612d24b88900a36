//! Authentication and session handling
//!
//! Bearer tokens map to rows in the sessions table. Permissions are
//! resolved fresh on every request, so revoking a grant takes effect on
//! the next call, not the next login.

pub mod password;
pub mod session;

pub use session::SessionRepo;

use easyvol_core::{Action, Module, PermissionSet};
use uuid::Uuid;

use crate::http::error::ApiError;

/// The resolved caller attached to a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub permissions: PermissionSet,
}

impl AuthenticatedUser {
    /// Deny with a 403 unless the caller holds the grant.
    pub fn require(&self, module: Module, action: Action) -> Result<(), ApiError> {
        if self.permissions.allows(module, action) {
            Ok(())
        } else {
            Err(ApiError::Forbidden {
                reason: format!("missing permission {}:{}", module, action),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(grants: &[(Module, Action)]) -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "mario".into(),
            display_name: "Mario Rossi".into(),
            permissions: grants.iter().copied().collect(),
        }
    }

    #[test]
    fn require_passes_with_grant() {
        let user = user_with(&[(Module::Members, Action::View)]);
        assert!(user.require(Module::Members, Action::View).is_ok());
    }

    #[test]
    fn require_rejects_missing_grant() {
        let user = user_with(&[(Module::Members, Action::View)]);
        let err = user.require(Module::Members, Action::Delete).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));
    }
}
