use axum::{
    Json,
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState};
use crate::db::User;
use crate::services::ActingIdentity;

// ============================================================================
// Roles
// ============================================================================

/// Access role carried on every login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A hosteler: creates and views their own out-passes.
    Student,
    /// Approves or rejects pending out-passes, manages hostelers.
    Warden,
    /// Gate security: records exit/entry scans.
    Guard,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Warden => "warden",
            Self::Guard => "guard",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "student" => Ok(Self::Student),
            "warden" => Ok(Self::Warden),
            "guard" => Ok(Self::Guard),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated caller, inserted into request extensions by the
/// middleware and consumed by handlers.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthedUser {
    fn from_user(user: User) -> Result<Self, ApiError> {
        let role = Role::parse(&user.role)
            .map_err(|e| ApiError::internal(format!("corrupt user row: {e}")))?;
        Ok(Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role,
        })
    }

    /// Explicit identity handed to the service layer.
    #[must_use]
    pub fn identity(&self) -> ActingIdentity {
        ActingIdentity {
            user_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    /// Role gate. Admin passes every check.
    pub fn require_any(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.role == Role::Admin || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role {} is not permitted for this operation",
                self.role.as_str()
            )))
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub role: Role,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct UserInfoResponse {
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct AuthQuery {
    api_key: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
/// 4. `?api_key=` query parameter
///
/// On success the resolved [`AuthedUser`] is inserted into request
/// extensions so handlers can enforce role checks with no further lookups.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    // Check session first (fastest path for web UI)
    if let Ok(Some(username)) = session.get::<String>("user").await
        && let Ok(Some(user)) = state.store().get_user(&username).await
    {
        let authed = AuthedUser::from_user(user)?;
        tracing::Span::current().record("user_id", &authed.username);
        request.extensions_mut().insert(authed);
        return Ok(next.run(request).await);
    }

    if let Some(key) = extract_api_key(&query, &headers)
        && let Ok(Some(user)) = state.store().verify_api_key(&key).await
    {
        let authed = AuthedUser::from_user(user)?;
        tracing::Span::current().record("user_id", &authed.username);
        request.extensions_mut().insert(authed);
        return Ok(next.run(request).await);
    }

    Err(ApiError::Unauthorized("Unauthorized".to_string()))
}

/// Extract API key from headers or query string
fn extract_api_key(query: &AuthQuery, headers: &HeaderMap) -> Option<String> {
    // Check X-Api-Key header
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    // Check Authorization: Bearer header
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    query.api_key.clone()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username and password, returns role and API key.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let valid = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await?;

    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let user = state
        .store()
        .get_user(&payload.username)
        .await?
        .ok_or_else(|| ApiError::internal("User vanished after verification"))?;
    let authed = AuthedUser::from_user(user.clone())?;

    session
        .insert("user", user.username.clone())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!("User {} logged in", user.username);

    Ok(Json(ApiResponse::success(LoginResponse {
        username: user.username,
        role: authed.role,
        api_key: user.api_key,
    })))
}

/// POST /auth/logout
pub async fn logout(
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    session
        .delete()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /auth/me
pub async fn me(
    axum::Extension(user): axum::Extension<AuthedUser>,
) -> Json<ApiResponse<UserInfoResponse>> {
    Json(ApiResponse::success(UserInfoResponse {
        username: user.username,
        email: user.email,
        role: user.role,
    }))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthedUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    if payload.current_password == payload.new_password {
        return Err(ApiError::validation(
            "New password must be different from current password",
        ));
    }

    let is_valid = state
        .store()
        .verify_user_password(&user.username, &payload.current_password)
        .await?;

    if !is_valid {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let security = state.config().read().await.security.clone();
    state
        .store()
        .update_user_password(&user.username, &payload.new_password, &security)
        .await?;

    tracing::info!("Password changed for user: {}", user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password changed".to_string(),
    })))
}

/// GET /auth/api-key
pub async fn get_api_key(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthedUser>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state
        .store()
        .get_user_api_key(&user.username)
        .await?
        .ok_or_else(|| ApiError::internal("API key not found"))?;

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

/// POST /auth/api-key/regenerate
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthedUser>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state
        .store()
        .regenerate_user_api_key(&user.username)
        .await?;

    tracing::info!("API key regenerated for user: {}", user.username);

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}
