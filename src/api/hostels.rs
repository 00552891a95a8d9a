use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthedUser, Role};
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, HostelRefDto, HostelerDto};
use crate::db::NewHosteler;

#[derive(Debug, Deserialize)]
pub struct CreateHostelRequest {
    pub name: String,
    pub slug: String,
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterHostelerRequest {
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub room_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub banned_till: Option<String>,
}

/// POST /hostels
pub async fn create_hostel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Json(payload): Json<CreateHostelRequest>,
) -> Result<Json<ApiResponse<HostelRefDto>>, ApiError> {
    user.require_any(&[])?; // admin only

    let name = payload.name.trim();
    let slug = payload.slug.trim();
    if name.is_empty() || slug.is_empty() {
        return Err(ApiError::validation("name and slug must not be empty"));
    }
    if state.store().get_hostel_by_slug(slug).await?.is_some() {
        return Err(ApiError::validation(format!(
            "Hostel slug '{slug}' is already taken"
        )));
    }

    let hostel = state
        .store()
        .add_hostel(name, slug, payload.gender.trim())
        .await?;
    Ok(Json(ApiResponse::success(HostelRefDto::from(hostel))))
}

/// GET /hostels
pub async fn list_hostels(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<HostelRefDto>>>, ApiError> {
    user.require_any(&[Role::Warden, Role::Guard])?;

    let hostels = state.store().list_hostels().await?;
    let dtos: Vec<HostelRefDto> = hostels.into_iter().map(HostelRefDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /hostels/{id}/students
pub async fn register_hosteler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(hostel_id): Path<i32>,
    Json(payload): Json<RegisterHostelerRequest>,
) -> Result<Json<ApiResponse<HostelerDto>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let hostel_id = validate_id("hostel", hostel_id)?;

    if state.store().get_hostel(hostel_id).await?.is_none() {
        return Err(ApiError::not_found("Hostel", hostel_id));
    }

    let name = payload.name.trim();
    let email = payload.email.trim();
    let roll = payload.roll_number.trim();
    if name.is_empty() || email.is_empty() || roll.is_empty() {
        return Err(ApiError::validation(
            "name, email and roll_number must not be empty",
        ));
    }
    if state.store().get_hosteler_by_email(email).await?.is_some() {
        return Err(ApiError::validation(format!(
            "A hosteler with email {email} already exists"
        )));
    }

    let hosteler = state
        .store()
        .add_hosteler(&NewHosteler {
            name: name.to_string(),
            email: email.to_string(),
            roll_number: roll.to_string(),
            hostel_id,
            room_number: payload
                .room_number
                .as_deref()
                .map_or(crate::domain::UNKNOWN_ROOM, str::trim)
                .to_string(),
        })
        .await?;

    Ok(Json(ApiResponse::success(HostelerDto::from(hosteler))))
}

/// GET /hostels/{id}/students
pub async fn list_hostelers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(hostel_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<HostelerDto>>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let hostel_id = validate_id("hostel", hostel_id)?;

    if state.store().get_hostel(hostel_id).await?.is_none() {
        return Err(ApiError::not_found("Hostel", hostel_id));
    }

    let hostelers = state.store().list_hostelers(hostel_id).await?;
    let dtos: Vec<HostelerDto> = hostelers.into_iter().map(HostelerDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /students/{id}/ban
pub async fn ban_hosteler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i32>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<ApiResponse<HostelerDto>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let id = validate_id("hosteler", id)?;

    if let Some(till) = payload.banned_till.as_deref()
        && chrono::DateTime::parse_from_rfc3339(till).is_err()
    {
        return Err(ApiError::validation(
            "banned_till must be an RFC 3339 timestamp",
        ));
    }

    let updated = state
        .store()
        .set_hosteler_ban(id, true, payload.banned_till.as_deref())
        .await?;
    if !updated {
        return Err(ApiError::not_found("Hosteler", id));
    }

    let hosteler = state
        .store()
        .get_hosteler(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Hosteler", id))?;
    Ok(Json(ApiResponse::success(HostelerDto::from(hosteler))))
}

/// POST /students/{id}/unban
pub async fn unban_hosteler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<HostelerDto>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let id = validate_id("hosteler", id)?;

    let updated = state.store().set_hosteler_ban(id, false, None).await?;
    if !updated {
        return Err(ApiError::not_found("Hosteler", id));
    }

    let hosteler = state
        .store()
        .get_hosteler(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Hosteler", id))?;
    Ok(Json(ApiResponse::success(HostelerDto::from(hosteler))))
}
