use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use bistro_db::models::{Role, User};
use bistro_services::auth::IssuedSession;
use bistro_services::dao::base::DaoError;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 80))]
    pub display_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    let restaurant_id = state.restaurant_id()?;
    let password_hash = state.auth.hash_password(&body.password)?;

    let user = state
        .users
        .create(body.email, body.display_name, body.phone, password_hash)
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Email is already registered".to_string())
            }
            other => other.into(),
        })?;
    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User stored without id".to_string()))?;

    let role = if state.is_admin_email(&user.email) {
        Role::Admin
    } else {
        Role::Customer
    };
    let membership = state
        .restaurant_users
        .ensure(restaurant_id, user_id, role)
        .await?;
    info!(%user_id, role = ?membership.role, "User registered");

    let (headers, response) = start_session(&state, &headers, user, user_id, membership.role).await?;
    Ok((StatusCode::CREATED, headers, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let restaurant_id = state.restaurant_id()?;
    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User stored without id".to_string()))?;
    let role = state.restaurant_users.role_of(restaurant_id, user_id).await?;

    let (headers, response) = start_session(&state, &headers, user, user_id, role).await?;
    Ok((headers, Json(response)))
}

/// Revokes the current session and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    state.sessions.revoke(&auth.claims.jti).await?;
    info!(user_id = %auth.user_id, "User signed out");

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, header_value(state.auth.clear_cookie())?);
    Ok((StatusCode::NO_CONTENT, headers))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.find_active(auth.user_id).await?;
    let role = state
        .restaurant_users
        .role_of(state.restaurant_id()?, auth.user_id)
        .await?;
    Ok(Json(to_response(user, auth.user_id, role)))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    body.validate()?;
    let user = state
        .users
        .update_profile(auth.user_id, body.display_name, body.phone)
        .await?;
    let role = state
        .restaurant_users
        .role_of(state.restaurant_id()?, auth.user_id)
        .await?;
    Ok(Json(to_response(user, auth.user_id, role)))
}

async fn start_session(
    state: &AppState,
    request_headers: &HeaderMap,
    user: User,
    user_id: ObjectId,
    role: Role,
) -> Result<(HeaderMap, AuthResponse), ApiError> {
    let session: IssuedSession = state.auth.issue_session(user_id, &user.email)?;
    let user_agent = request_headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    state
        .sessions
        .create(session.jti.clone(), user_id, session.expires_at, user_agent)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        header_value(state.auth.session_cookie(&session))?,
    );

    let response = AuthResponse {
        expires_at: session.expires_at.to_rfc3339(),
        token: session.token,
        user: to_response(user, user_id, role),
    };
    Ok((headers, response))
}

fn header_value(value: String) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(e.to_string()))
}

fn to_response(user: User, user_id: ObjectId, role: Role) -> UserResponse {
    UserResponse {
        id: user_id.to_hex(),
        email: user.email,
        display_name: user.display_name,
        phone: user.phone,
        role,
    }
}
