use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use bistro_db::models::Role;
use bistro_services::auth::{AuthError, Claims};
use bson::oid::ObjectId;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Extracts the authenticated user from the session JWT (cookie or
/// Authorization header). The session must still exist in the store.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub email: String,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_value(parts, state.auth.cookie_name()))
            .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;

        let claims = state.auth.verify_session_token(&token)?;

        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        if !state.sessions.is_active(&claims.jti, user_id).await? {
            debug!(jti = %claims.jti, %user_id, "Rejected revoked session");
            return Err(AuthError::SessionRevoked.into());
        }

        Ok(AuthUser {
            user_id,
            email: claims.email.clone(),
            claims,
        })
    }
}

/// Signed-in user holding the staff or admin role for the restaurant.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user: AuthUser,
    pub restaurant_id: ObjectId,
    pub role: Role,
}

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let restaurant_id = state.restaurant_id()?;
        let role = state
            .restaurant_users
            .role_of(restaurant_id, user.user_id)
            .await?;
        if !role.is_staff() {
            return Err(ApiError::Forbidden("Staff role required".to_string()));
        }
        Ok(StaffUser {
            user,
            restaurant_id,
            role,
        })
    }
}

/// Signed-in user holding the admin role for the restaurant.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: AuthUser,
    pub restaurant_id: ObjectId,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let restaurant_id = state.restaurant_id()?;
        let role = state
            .restaurant_users
            .role_of(restaurant_id, user.user_id)
            .await?;
        if !role.is_admin() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminUser {
            user,
            restaurant_id,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}
