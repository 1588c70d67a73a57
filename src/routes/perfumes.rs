use std::collections::HashMap;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Perfume, PerfumeChanges, PerfumeFields, PerfumeResponse};
use crate::state::SharedState;
use crate::upload::UploadError;

const IMAGE_FIELD: &str = "image";

#[derive(Deserialize)]
pub struct InsertPerfumeRequest {
    #[serde(flatten)]
    pub fields: PerfumeFields,
    #[serde(default)]
    pub image: String,
}

#[derive(Serialize)]
pub struct PerfumeEnvelope {
    pub message: String,
    pub perfume: PerfumeResponse,
}

struct ImageFile {
    extension: String,
    content: Vec<u8>,
}

/// `.png` for `rose.png`, empty when the upload has no extension. Case is
/// kept as uploaded.
fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

fn require_name(fields: &PerfumeFields) -> Result<(), AppError> {
    if fields.name.trim().is_empty() {
        return Err(AppError::BadRequest("Perfume name is required".to_string()));
    }
    Ok(())
}

fn created(message: &str, perfume: Perfume) -> (StatusCode, Json<PerfumeEnvelope>) {
    (
        StatusCode::CREATED,
        Json(PerfumeEnvelope {
            message: message.to_string(),
            perfume: perfume.into(),
        }),
    )
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PerfumeEnvelope>), AppError> {
    auth.require_admin()?;
    let mut multipart = multipart?;

    let mut fields = PerfumeFields::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let extension = field.file_name().map(extension_of).unwrap_or_default();
            let content = field.bytes().await?;
            if !content.is_empty() {
                image = Some(ImageFile {
                    extension,
                    content: content.to_vec(),
                });
            }
        } else {
            let value = field.text().await?;
            fields.set(&name, value);
        }
    }

    require_name(&fields)?;
    let image =
        image.ok_or_else(|| AppError::BadRequest("Image file is required".to_string()))?;

    let uploader = state.images.as_ref().ok_or(UploadError::NotConfigured)?;

    let id = ObjectId::new();
    let file_name = format!("{}{}", id.to_hex(), image.extension);
    let url = uploader.upload(&file_name, &image.content).await?;
    tracing::info!(perfume_id = %id, %url, "Perfume image uploaded");

    let perfume = state.perfumes.insert(Perfume::new(id, fields, url)).await?;

    Ok(created("Perfume created successfully", perfume))
}

pub async fn insert(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<InsertPerfumeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PerfumeEnvelope>), AppError> {
    auth.require_admin()?;
    let Json(req) = payload?;
    require_name(&req.fields)?;

    let perfume = state
        .perfumes
        .insert(Perfume::new(ObjectId::new(), req.fields, req.image))
        .await?;

    Ok(created("Perfume inserted successfully", perfume))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<PerfumeResponse>>, AppError> {
    let perfumes = state.perfumes.list().await?;
    Ok(Json(perfumes.into_iter().map(PerfumeResponse::from).collect()))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PerfumeEnvelope>, AppError> {
    let perfume = state
        .perfumes
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Perfume not found".to_string()))?;

    Ok(Json(PerfumeEnvelope {
        message: "Perfume retrieved successfully".to_string(),
        perfume: perfume.into(),
    }))
}

pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PerfumeResponse>>, AppError> {
    let filters: Vec<(String, String)> = params
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();

    let perfumes = state.perfumes.search(filters).await?;
    Ok(Json(perfumes.into_iter().map(PerfumeResponse::from).collect()))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<PerfumeChanges>, JsonRejection>,
) -> Result<Json<PerfumeEnvelope>, AppError> {
    auth.require_admin()?;
    let Json(changes) = payload?;

    if changes.supplied().is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let perfume = state.perfumes.update(&id, changes).await?;

    Ok(Json(PerfumeEnvelope {
        message: "Perfume updated successfully".to_string(),
        perfume: perfume.into(),
    }))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;

    state.perfumes.delete(&id).await?;
    tracing::info!(perfume_id = %id, "Perfume deleted");

    Ok(Json(MessageResponse::new("Perfume deleted successfully")))
}
