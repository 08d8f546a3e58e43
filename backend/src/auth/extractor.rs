use crate::error::{ApiError, AuthError};
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use common::model::user::Role;
use std::future::{ready, Ready};

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Caller holding the Admin or SuperAdmin role.
#[derive(Debug, Clone)]
pub struct UserManager(pub AuthenticatedUser);

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state not configured".to_string()))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("non-ascii header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("expected a Bearer token".to_string()))?;

    let claims = state.tokens.verify(token.trim())?;
    Ok(AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl FromRequest for UserManager {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|user| {
            if user.role.can_manage_users() {
                Ok(UserManager(user))
            } else {
                Err(AuthError::Forbidden.into())
            }
        }))
    }
}
