#![allow(dead_code)]

use std::str::FromStr;

use chrono::Utc;
use little_lemon_api::{
    db::{create_orm_conn, run_migrations},
    dto::cart::{AddToCartRequest, MenuItemRef},
    entity::{categories, menu_items, user_roles, users},
    policy::{Actor, Role, RoleSet},
    services::cart_service,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Connect to the test database, or `None` when none is configured.
pub async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;

    Ok(Some(AppState::new(orm, "test-secret")))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, roles: &[Role]) -> anyhow::Result<Actor> {
    let username = unique("user");
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{username}@example.com")),
        username: Set(username),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    for role in roles {
        user_roles::ActiveModel {
            user_id: Set(user.id),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&state.orm)
        .await?;
    }

    Ok(Actor::new(user.id, roles.iter().copied().collect::<RoleSet>()))
}

pub async fn username_of(state: &AppState, actor: &Actor) -> anyhow::Result<String> {
    use sea_orm::EntityTrait;
    let user = users::Entity::find_by_id(actor.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user vanished"))?;
    Ok(user.username)
}

pub async fn create_category(state: &AppState) -> anyhow::Result<Uuid> {
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(unique("test")),
        title: Set("Test Category".into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub async fn create_menu_item(
    state: &AppState,
    category_id: Uuid,
    price: &str,
) -> anyhow::Result<menu_items::Model> {
    let item = menu_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(unique("dish")),
        price: Set(Decimal::from_str(price)?),
        featured: Set(false),
        category_id: Set(category_id),
        item_of_the_day: Set(false),
    }
    .insert(&state.orm)
    .await?;
    Ok(item)
}

pub async fn add_to_cart(
    state: &AppState,
    actor: &Actor,
    item: &menu_items::Model,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        actor,
        AddToCartRequest {
            menuitem: MenuItemRef::Id(item.id),
            quantity,
        },
    )
    .await?;
    Ok(())
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}
