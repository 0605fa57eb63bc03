use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Resolve the caller of a route that accepts anonymous requests.
///
/// No header means an anonymous caller. A header that is present but does not
/// validate is rejected rather than silently downgraded to anonymous.
pub fn resolve_optional_user(
    auth: Option<&TypedHeader<Authorization<Bearer>>>,
    jwt_secret: &str,
) -> Result<Option<User>, AppError> {
    match auth {
        None => Ok(None),
        Some(TypedHeader(header)) => validate_token(header.token(), jwt_secret)
            .map(Some)
            .map_err(AppError::Auth),
    }
}

/// Resolve the caller of a route that requires a staff account.
pub fn require_staff(
    auth: Option<&TypedHeader<Authorization<Bearer>>>,
    jwt_secret: &str,
) -> Result<User, AppError> {
    let user = resolve_optional_user(auth, jwt_secret)?
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    if !user.is_staff() {
        return Err(AppError::Auth("Staff account required".to_string()));
    }

    Ok(user)
}
