use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::StoreError;
use crate::error::AppError;
use crate::models::{Role, RoleResponse};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateRoleRequest {
    #[serde(default)]
    pub role_id: String,
    #[serde(default)]
    pub role_name: String,
}

#[derive(Serialize)]
pub struct RoleEnvelope {
    pub message: String,
    pub role: RoleResponse,
}

#[derive(Serialize)]
pub struct RolesEnvelope {
    pub message: String,
    pub roles: Vec<RoleResponse>,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoleEnvelope>), AppError> {
    auth.require_admin()?;
    let Json(req) = payload?;

    let role_name = req.role_name.trim();
    if role_name.is_empty() {
        return Err(AppError::BadRequest("Role name is required".to_string()));
    }

    let role = state
        .roles
        .create(Role::new(req.role_id.trim(), role_name))
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::Conflict("Role already exists".to_string()),
            other => other.into(),
        })?;

    tracing::info!(role_id = %role.id, role_name = %role.role_name, "Role created");

    Ok((
        StatusCode::CREATED,
        Json(RoleEnvelope {
            message: "Role created successfully".to_string(),
            role: role.into(),
        }),
    ))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<RolesEnvelope>, AppError> {
    let roles = state.roles.list().await?;
    Ok(Json(RolesEnvelope {
        message: "Roles retrieved successfully".to_string(),
        roles: roles.into_iter().map(RoleResponse::from).collect(),
    }))
}
