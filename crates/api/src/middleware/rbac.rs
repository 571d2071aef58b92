//! Role checks layered on top of [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pixora_core::error::CoreError;
use pixora_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Admin-only extractor used by the curation routes.
///
/// A missing or invalid token is still a 401; a valid token without the
/// admin role is a 403.
pub struct RequireAdmin(pub AuthUser);

fn require_role(user: AuthUser, role: &str) -> Result<AuthUser, AppError> {
    if user.role == role {
        Ok(user)
    } else {
        Err(AppError::Core(CoreError::Forbidden(format!(
            "The '{role}' role is required"
        ))))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(user, ROLE_ADMIN).map(RequireAdmin)
    }
}

#[cfg(test)]
mod tests {
    use pixora_core::roles::ROLE_AUTHENTICATED;
    use pixora_core::types::UserId;

    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: UserId::new_v4(),
            role: role.to_string(),
            premium: false,
        }
    }

    #[test]
    fn admin_passes() {
        assert!(require_role(user(ROLE_ADMIN), ROLE_ADMIN).is_ok());
    }

    #[test]
    fn regular_user_is_forbidden() {
        let err = require_role(user(ROLE_AUTHENTICATED), ROLE_ADMIN).unwrap_err();
        assert!(matches!(err, AppError::Core(CoreError::Forbidden(_))));
    }
}
