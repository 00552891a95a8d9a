use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthedUser, Role};
use super::validation::{validate_id, validate_search_query};
use super::{ApiError, ApiResponse, AppState, HostelListQuery, OutPassDetailDto, OutPassDto};
use crate::domain::{GateEvent, OutPassId, PassDecision};
use crate::models::HostelPageFilter;
use crate::services::CreateOutPassRequest;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub action: PassDecision,
}

#[derive(Debug, Deserialize)]
pub struct GateEventRequest {
    pub event: GateEvent,
}

/// POST /outpasses
/// A hosteler submits a new out-pass request.
pub async fn create_outpass(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Json(payload): Json<CreateOutPassRequest>,
) -> Result<Json<ApiResponse<OutPassDto>>, ApiError> {
    user.require_any(&[Role::Student])?;

    let pass = state
        .outpasses()
        .create_request(&user.identity(), payload)
        .await?;

    Ok(Json(ApiResponse::success(OutPassDto::from(pass))))
}

/// GET /outpasses/mine
pub async fn list_my_outpasses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<Vec<OutPassDto>>>, ApiError> {
    user.require_any(&[Role::Student])?;

    let hosteler = state
        .store()
        .get_hosteler_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No hosteler record for this account".to_string()))?;

    let passes = state.outpasses().list_for_student(hosteler.id).await?;
    let dtos: Vec<OutPassDto> = passes.into_iter().map(OutPassDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /outpasses/{id}
/// Staff see any pass; a student sees only their own.
pub async fn get_outpass(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OutPassDetailDto>>, ApiError> {
    let id = validate_id("outpass", id)?;

    let detail = state.outpasses().get_by_id(OutPassId::new(id)).await?;

    if user.role == Role::Student && detail.student.email != user.email {
        return Err(ApiError::forbidden("This out-pass belongs to another hosteler"));
    }

    Ok(Json(ApiResponse::success(OutPassDetailDto::from(detail))))
}

/// POST /outpasses/{id}/decision
/// Warden approves or rejects a pending request.
pub async fn decide_outpass(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i32>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<OutPassDto>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let id = validate_id("outpass", id)?;

    let pass = state
        .outpasses()
        .decide(OutPassId::new(id), payload.action)
        .await?;

    Ok(Json(ApiResponse::success(OutPassDto::from(pass))))
}

/// POST /outpasses/{id}/gate
/// Gate security records an exit or entry scan.
pub async fn record_gate_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i32>,
    Json(payload): Json<GateEventRequest>,
) -> Result<Json<ApiResponse<OutPassDto>>, ApiError> {
    user.require_any(&[Role::Guard])?;
    let id = validate_id("outpass", id)?;

    let pass = state
        .outpasses()
        .record_gate_event(OutPassId::new(id), payload.event)
        .await?;

    Ok(Json(ApiResponse::success(OutPassDto::from(pass))))
}

/// GET /hostels/{id}/outpasses
/// Warden's paged listing with student/hostel projections.
pub async fn list_hostel_outpasses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Path(hostel_id): Path<i32>,
    Query(params): Query<HostelListQuery>,
) -> Result<Json<ApiResponse<Vec<OutPassDetailDto>>>, ApiError> {
    user.require_any(&[Role::Warden])?;
    let hostel_id = validate_id("hostel", hostel_id)?;

    let query = match params.query.as_deref() {
        Some(q) => {
            let q = validate_search_query(q)?;
            (!q.is_empty()).then(|| q.to_string())
        }
        None => None,
    };

    let filter = HostelPageFilter {
        query,
        offset: params.offset,
        limit: params.limit,
        sort: params.sort.unwrap_or_default(),
    };

    let rows = state.outpasses().list_for_hostel(hostel_id, filter).await?;
    let dtos: Vec<OutPassDetailDto> = rows.into_iter().map(OutPassDetailDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
