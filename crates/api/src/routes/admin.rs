use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use bistro_db::models::{RestaurantUser, Role, User};
use bistro_services::dao::base::{PaginatedResult, PaginationParams};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_oid;
use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::AdminUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
}

pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<PaginatedResult<MemberResponse>>, ApiError> {
    let defaults = PaginationParams::default();
    let params = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let members = state
        .restaurant_users
        .list(admin.restaurant_id, query.role, &params)
        .await?;

    let ids: Vec<ObjectId> = members.items.iter().map(|m| m.user_id).collect();
    let mut users: HashMap<ObjectId, User> = state
        .users
        .find_many_by_ids(&ids)
        .await?
        .into_iter()
        .filter_map(|u| u.id.map(|id| (id, u)))
        .collect();

    Ok(Json(members.map(|m| {
        let user = users.remove(&m.user_id);
        to_response(m, user)
    })))
}

pub async fn set_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let user_id = parse_oid(&user_id, "user id")?;
    if user_id == admin.user.user_id && !body.role.is_admin() {
        return Err(ApiError::BadRequest(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }
    let user = state.users.find_active(user_id).await?;
    let member = state
        .restaurant_users
        .set_role(admin.restaurant_id, user_id, body.role)
        .await?;
    info!(%user_id, role = ?body.role, by = %admin.user.user_id, "Role changed");
    Ok(Json(to_response(member, Some(user))))
}

fn to_response(member: RestaurantUser, user: Option<User>) -> MemberResponse {
    MemberResponse {
        user_id: member.user_id.to_hex(),
        email: user.as_ref().map(|u| u.email.clone()),
        display_name: user.map(|u| u.display_name),
        role: member.role,
    }
}
