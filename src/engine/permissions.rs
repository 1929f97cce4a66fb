//! Role checks for mutating operations.

use crate::error::{LedgerError, Result};
use crate::models::User;

/// Succeeds only when `user` is present and holds the admin role.
///
/// # Errors
///
/// Returns [`LedgerError::PermissionDenied`] otherwise.
pub fn require_admin(user: Option<&User>) -> Result<()> {
    match user {
        Some(admin) if admin.is_admin() => Ok(()),
        Some(member) => Err(LedgerError::PermissionDenied(format!(
            "user {} is not an admin",
            member.id
        ))),
        None => Err(LedgerError::PermissionDenied(
            "no user is signed in".to_owned(),
        )),
    }
}
