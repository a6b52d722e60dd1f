use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::groups::{AddMemberRequest, GroupMembers, Membership},
    entity::{
        user_roles::{ActiveModel as UserRoleActive, Column as RoleCol, Entity as UserRoles},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::User,
    policy::{Action, Actor, Role, authorize},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn holds_role<C>(conn: &C, user_id: Uuid, role: Role) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let count = UserRoles::find()
        .filter(RoleCol::UserId.eq(user_id))
        .filter(RoleCol::Role.eq(role.as_str()))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn list_members(
    state: &AppState,
    actor: &Actor,
    group: Role,
) -> AppResult<ApiResponse<GroupMembers>> {
    authorize(actor, Action::ManageGroup(group))?;
    let users: Vec<User> = Users::find()
        .inner_join(UserRoles)
        .filter(RoleCol::Role.eq(group.as_str()))
        .order_by_asc(UserCol::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::single_page(users.len());
    Ok(ApiResponse::success("Members", GroupMembers { group, users }, Some(meta)))
}

/// Add a user to a staff group by username. Adding an existing member is a no-op.
pub async fn add_member(
    state: &AppState,
    actor: &Actor,
    group: Role,
    payload: AddMemberRequest,
) -> AppResult<ApiResponse<Membership>> {
    authorize(actor, Action::ManageGroup(group))?;
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::bad_request("Username is required"))?;

    let txn = state.orm.begin().await?;
    // Row lock on the user serializes concurrent role changes for them.
    let user = Users::find()
        .filter(UserCol::Username.eq(username))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let conflicting = group.conflicting();
    if holds_role(&txn, user.id, conflicting).await? {
        return Err(AppError::bad_request(format!(
            "User already belongs to the {conflicting} group"
        )));
    }

    let inserted = UserRoles::insert(UserRoleActive {
        user_id: Set(user.id),
        role: Set(group.as_str().to_string()),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::columns([RoleCol::UserId, RoleCol::Role])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&txn)
    .await?;
    txn.commit().await?;

    let added = inserted > 0;
    if added {
        tracing::info!(user_id = %user.id, group = %group, "group member added");
        audit::record(
            state,
            actor.user_id,
            "group_add",
            "user_roles",
            serde_json::json!({ "user_id": user.id, "group": group }),
        )
        .await;
    }

    let message = if added {
        format!("User added to the {group} group")
    } else {
        format!("User already in the {group} group")
    };
    Ok(ApiResponse::success(
        message,
        Membership {
            group,
            user: user.into(),
            added,
        },
        Some(Meta::empty()),
    ))
}

/// Remove a user from a staff group. Unknown users and non-members are `NotFound`.
pub async fn remove_member(
    state: &AppState,
    actor: &Actor,
    group: Role,
    user_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    authorize(actor, Action::ManageGroup(group))?;
    if Users::find_by_id(user_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let result = UserRoles::delete_many()
        .filter(RoleCol::UserId.eq(user_id))
        .filter(RoleCol::Role.eq(group.as_str()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %user_id, group = %group, "group member removed");
    audit::record(
        state,
        actor.user_id,
        "group_remove",
        "user_roles",
        serde_json::json!({ "user_id": user_id, "group": group }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("User removed from the {group} group"),
        serde_json::json!({ "user_id": user_id }),
        Some(Meta::empty()),
    ))
}
