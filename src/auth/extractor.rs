use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::auth::jwt::Claims;
use crate::error::AppError;
use crate::models::ADMIN_ROLE_ID;
use crate::state::SharedState;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role_id: String,
    pub role_name: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role_id == ADMIN_ROLE_ID
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            role_id: claims.role_id,
            role_name: claims.role_name,
        }
    }
}

/// Token from `Authorization: Bearer`, else from the login cookie.
fn request_token(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(TOKEN_COOKIE).map(|cookie| cookie.value().to_string()))
}

fn verify(state: &SharedState, token: &str) -> Result<AuthUser, AppError> {
    state
        .auth
        .tokens()
        .verify(token)
        .map(AuthUser::from)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        match request_token(parts)? {
            Some(token) => verify(state, &token),
            None => Err(AppError::Unauthorized("Unauthorized".to_string())),
        }
    }
}

/// Anonymous requests give `None`; a token that is present must be valid.
impl OptionalFromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        request_token(parts)?
            .map(|token| verify(state, &token))
            .transpose()
    }
}
