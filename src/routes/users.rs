use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::auth::{password, validator, AuthUser};
use crate::error::AppError;
use crate::models::{UserChanges, UserResponse};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<String>,
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct UsersEnvelope {
    pub message: String,
    pub users: Vec<UserResponse>,
}

/// Admins may act on anyone; other users only on themselves.
fn require_self_or_admin(auth: &AuthUser, id: &str) -> Result<(), AppError> {
    if auth.is_admin() || auth.user_id == id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You may only access your own account".to_string(),
        ))
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<UsersEnvelope>, AppError> {
    auth.require_admin()?;

    let users = state.users.list().await?;
    Ok(Json(UsersEnvelope {
        message: "Users retrieved successfully".to_string(),
        users: users.iter().map(UserResponse::from).collect(),
    }))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    require_self_or_admin(&auth, &id)?;

    let user = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserEnvelope {
        message: "User retrieved successfully".to_string(),
        user: UserResponse::from(&user),
    }))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, AppError> {
    require_self_or_admin(&auth, &id)?;
    let Json(req) = payload?;

    let mut changes = UserChanges {
        username: req.username.filter(|u| !u.is_empty()),
        ..Default::default()
    };

    if let Some(email) = req.email {
        if !validator::is_email_valid(&email) {
            return Err(AppError::BadRequest("Invalid email format".to_string()));
        }
        changes.email = Some(email);
    }

    if let Some(phone) = req.phone {
        let phone = validator::normalize_phone(&phone)
            .ok_or_else(|| AppError::BadRequest("Invalid phone number format".to_string()))?;
        changes.phone = Some(phone);
    }

    if let Some(plain) = req.password.filter(|p| !p.is_empty()) {
        changes.password_hash = Some(password::hash(&plain).map_err(AppError::Internal)?);
    }

    if let Some(role_id) = req.role_id.filter(|r| !r.is_empty()) {
        auth.require_admin()?;
        let role = state
            .roles
            .find_by_id(&role_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Role {role_id} does not exist")))?;
        changes.role_id = Some(role.id);
        changes.role_name = Some(role.role_name);
    }

    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let user = state.users.update(&id, changes).await?;

    Ok(Json(UserEnvelope {
        message: "User updated successfully".to_string(),
        user: UserResponse::from(&user),
    }))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;

    state.users.delete(&id).await?;
    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
