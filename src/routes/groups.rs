use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::groups::{AddMemberRequest, GroupMembers, Membership},
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath},
    middleware::auth::AuthUser,
    policy::Role,
    response::ApiResponse,
    services::group_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{group}/users", get(list_members).post(add_member))
        .route("/{group}/users/{user_id}", delete(remove_member))
}

/// URL names of the staff groups.
pub fn group_role(name: &str) -> AppResult<Role> {
    match name {
        "manager" => Ok(Role::Manager),
        "deliverycrew" | "delivery-crew" => Ok(Role::DeliveryCrew),
        _ => Err(AppError::NotFound),
    }
}

#[utoipa::path(
    get,
    path = "/api/groups/{group}/users",
    params(("group" = String, Path, description = "manager or deliverycrew")),
    responses(
        (status = 200, description = "Group members", body = ApiResponse<GroupMembers>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown group"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(group): ApiPath<String>,
) -> AppResult<Json<ApiResponse<GroupMembers>>> {
    let role = group_role(&group)?;
    let resp = group_service::list_members(&state, &user, role).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group}/users",
    params(("group" = String, Path, description = "manager or deliverycrew")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "User added", body = ApiResponse<Membership>),
        (status = 200, description = "User was already a member", body = ApiResponse<Membership>),
        (status = 400, description = "Missing username or conflicting role"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(group): ApiPath<String>,
    ApiJson(payload): ApiJson<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Membership>>)> {
    let role = group_role(&group)?;
    let resp = group_service::add_member(&state, &user, role, payload).await?;
    let added = resp.data.as_ref().is_some_and(|membership| membership.added);
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group}/users/{user_id}",
    params(
        ("group" = String, Path, description = "manager or deliverycrew"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User removed", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found or not a member"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((group, user_id)): ApiPath<(String, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let role = group_role(&group)?;
    let resp = group_service::remove_member(&state, &user, role, user_id).await?;
    Ok(Json(resp))
}
