use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::auth::extractor::TOKEN_COOKIE;
use crate::auth::jwt::TOKEN_TTL_HOURS;
use crate::auth::{AuthUser, Credentials, Registration};
use crate::error::AppError;
use crate::models::UserResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    pub role_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub username: String,
    pub role_id: String,
    pub role_name: String,
}

#[derive(Serialize)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: CurrentUser,
}

fn token_cookie(token: &str, secure: bool) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(TOKEN_TTL_HOURS))
        .build();

    CookieJar::new().add(cookie)
}

fn clear_token_cookie() -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(cookie)
}

/// Open to anonymous callers for the customer role; any other role needs an
/// admin token.
pub async fn register(
    caller: Option<AuthUser>,
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;
    let by_admin = caller.as_ref().is_some_and(AuthUser::is_admin);

    let user = state
        .auth
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            phone: req.phone,
            role_id: req.role_id,
            by_admin,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created successfully".to_string(),
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let Json(req) = payload?;

    let session = state
        .auth
        .login(Credentials {
            email: req.email,
            username: req.username,
            password: req.password,
        })
        .await?;

    let jar = token_cookie(&session.token, state.config.cookie_secure);
    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            token: session.token,
        }),
    ))
}

pub async fn logout() -> (CookieJar, Json<MessageResponse>) {
    (
        clear_token_cookie(),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

pub async fn protected(auth: AuthUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "Access granted".to_string(),
        user: CurrentUser {
            user_id: auth.user_id,
            username: auth.username,
            role_id: auth.role_id,
            role_name: auth.role_name,
        },
    })
}
