//! Credentials, access tokens and the role guard used by the HTTP layer.

pub mod extractor;
pub mod password;
pub mod token;

use crate::error::{ApiError, AuthError};
use crate::store::SqliteStore;
use common::requests::TokenResponse;
use password::Hasher;
use token::TokenIssuer;

/// Exchanges email and password for an access token.
///
/// The email is matched case-insensitively after trimming. Unknown users,
/// wrong passwords and deactivated accounts all fail the same way.
pub fn login(
    store: &SqliteStore,
    hasher: &Hasher,
    tokens: &TokenIssuer,
    email: &str,
    password: &str,
) -> Result<TokenResponse, ApiError> {
    let email = email.trim().to_lowercase();
    let credentials = store
        .find_credentials(&email)?
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = credentials.password.as_deref().unwrap_or_default();
    if !credentials.is_active || !hasher.verify(password, hash) {
        return Err(AuthError::InvalidCredentials.into());
    }

    store.touch_last_login(&credentials.id)?;
    let token = tokens.issue(&credentials.id, &credentials.email, credentials.role)?;
    Ok(TokenResponse {
        token,
        role: credentials.role,
    })
}
