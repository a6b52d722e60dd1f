mod common;

use little_lemon_api::{
    dto::groups::AddMemberRequest,
    error::AppError,
    policy::Role,
    services::group_service,
};
use uuid::Uuid;

use common::{create_user, test_state, username_of};

fn named(username: &str) -> AddMemberRequest {
    AddMemberRequest {
        username: Some(username.to_string()),
    }
}

#[tokio::test]
async fn adding_crew_is_idempotent_and_removable() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let manager = create_user(&state, &[Role::Manager]).await?;
    let candidate = create_user(&state, &[]).await?;
    let username = username_of(&state, &candidate).await?;

    let first = group_service::add_member(&state, &manager, Role::DeliveryCrew, named(&username))
        .await?
        .data
        .expect("membership");
    assert!(first.added);
    assert_eq!(first.user.id, candidate.user_id);
    assert!(group_service::holds_role(&state.orm, candidate.user_id, Role::DeliveryCrew).await?);

    let second = group_service::add_member(&state, &manager, Role::DeliveryCrew, named(&username))
        .await?
        .data
        .expect("membership");
    assert!(!second.added);

    let members = group_service::list_members(&state, &manager, Role::DeliveryCrew)
        .await?
        .data
        .expect("members");
    assert!(members.users.iter().any(|user| user.id == candidate.user_id));

    group_service::remove_member(&state, &manager, Role::DeliveryCrew, candidate.user_id).await?;
    assert!(!group_service::holds_role(&state.orm, candidate.user_id, Role::DeliveryCrew).await?);

    let again =
        group_service::remove_member(&state, &manager, Role::DeliveryCrew, candidate.user_id).await;
    assert!(matches!(again, Err(AppError::NotFound)));

    Ok(())
}

#[tokio::test]
async fn staff_roles_are_exclusive() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let manager = create_user(&state, &[Role::Manager]).await?;
    let crew = create_user(&state, &[Role::DeliveryCrew]).await?;
    let username = username_of(&state, &crew).await?;

    let result = group_service::add_member(&state, &manager, Role::Manager, named(&username)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(!group_service::holds_role(&state.orm, crew.user_id, Role::Manager).await?);

    Ok(())
}

#[tokio::test]
async fn group_management_requires_a_manager() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let manager = create_user(&state, &[Role::Manager]).await?;
    let crew = create_user(&state, &[Role::DeliveryCrew]).await?;
    let customer = create_user(&state, &[]).await?;
    let username = username_of(&state, &customer).await?;

    let by_crew =
        group_service::add_member(&state, &crew, Role::DeliveryCrew, named(&username)).await;
    assert!(matches!(by_crew, Err(AppError::Forbidden)));
    let listing = group_service::list_members(&state, &customer, Role::Manager).await;
    assert!(matches!(listing, Err(AppError::Forbidden)));

    let blank = group_service::add_member(&state, &manager, Role::DeliveryCrew, named("  ")).await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));
    let missing = group_service::add_member(
        &state,
        &manager,
        Role::DeliveryCrew,
        AddMemberRequest { username: None },
    )
    .await;
    assert!(matches!(missing, Err(AppError::BadRequest(_))));
    let unknown =
        group_service::add_member(&state, &manager, Role::DeliveryCrew, named("nobody-here")).await;
    assert!(matches!(unknown, Err(AppError::NotFound)));

    let ghost =
        group_service::remove_member(&state, &manager, Role::DeliveryCrew, Uuid::new_v4()).await;
    assert!(matches!(ghost, Err(AppError::NotFound)));

    Ok(())
}
