use uuid::Uuid;

use crate::{
    auth::repo_types::{Role, User},
    errors::{AppError, AppResult},
};

/// Refuses to remove the last active admin or the caller's own account.
pub fn check_deletion(target: &User, actor_id: Uuid, active_admins: i64) -> AppResult<()> {
    if target.role == Role::Admin && target.is_active && active_admins <= 1 {
        return Err(AppError::bad_request("Cannot delete the last admin account"));
    }
    if target.id == actor_id {
        return Err(AppError::bad_request("Cannot delete your own account"));
    }
    Ok(())
}
