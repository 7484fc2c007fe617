use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::AuthUser, repo, repo_types::Role};
use crate::{errors::AppError, state::AppState};

/// Authenticated caller with role and active flag checked against the database.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = self.role.as_str(), "insufficient permissions");
            Err(AppError::Forbidden("Insufficient permissions".into()))
        }
    }
}

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const STAFF_OR_ADMIN: &[Role] = &[Role::Admin, Role::Staff];

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let (email, role, is_active) = repo::role_and_status(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User profile not found"))?;

        if !is_active {
            warn!(user_id = %user_id, "deactivated account");
            return Err(AppError::Forbidden("Account is deactivated".into()));
        }

        Ok(Actor {
            id: user_id,
            email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: "someone@kina.example".into(),
            role,
        }
    }

    #[test]
    fn require_accepts_listed_roles() {
        assert!(actor(Role::Admin).require(ADMIN_ONLY).is_ok());
        assert!(actor(Role::Staff).require(STAFF_OR_ADMIN).is_ok());
    }

    #[test]
    fn require_rejects_other_roles_with_forbidden() {
        let err = actor(Role::Staff).require(ADMIN_ONLY).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "Insufficient permissions"));
        assert!(actor(Role::Customer).require(STAFF_OR_ADMIN).is_err());
    }
}
