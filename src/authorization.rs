use tracing::debug;

use crate::{authentication::TokenClaims, http_err::ApiError};

/// Reject the request unless the actor is an administrator.
pub fn require_admin(claims: &TokenClaims) -> Result<(), ApiError> {
    if claims.is_admin() {
        Ok(())
    } else {
        debug!(
            user_id = claims.user_id(),
            "Rejected request for admin-only operation."
        );

        Err(ApiError::Forbidden)
    }
}
