use std::str::FromStr;

use chrono::Utc;
use little_lemon_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        Categories, MenuItems, UserRoles, Users, categories, menu_items, user_roles, users,
    },
    middleware::auth::issue_token,
    policy::Role,
};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,little_lemon_api=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let manager = ensure_user(&orm, "mario", Some(Role::Manager)).await?;
    let crew = ensure_user(&orm, "adrian", Some(Role::DeliveryCrew)).await?;
    let customer = ensure_user(&orm, "tilly", None).await?;
    seed_menu(&orm).await?;

    for (name, id) in [("manager", manager), ("delivery crew", crew), ("customer", customer)] {
        let token = issue_token(id, &config.jwt_secret, 24 * 7)?;
        println!("{name} ({id}): Bearer {token}");
    }
    tracing::info!("seed completed");
    Ok(())
}

async fn ensure_user(orm: &OrmConn, username: &str, role: Option<Role>) -> anyhow::Result<Uuid> {
    Users::insert(users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@littlelemon.test")),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(OnConflict::column(users::Column::Username).do_nothing().to_owned())
    .exec_without_returning(orm)
    .await?;

    let user = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {username} missing after insert"))?;

    if let Some(role) = role {
        UserRoles::insert(user_roles::ActiveModel {
            user_id: Set(user.id),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        })
        .on_conflict(
            OnConflict::columns([user_roles::Column::UserId, user_roles::Column::Role])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(orm)
        .await?;
    }

    tracing::info!(username, role = ?role, "ensured user");
    Ok(user.id)
}

async fn ensure_category(orm: &OrmConn, slug: &str, title: &str) -> anyhow::Result<Uuid> {
    Categories::insert(categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.to_string()),
        title: Set(title.to_string()),
    })
    .on_conflict(OnConflict::column(categories::Column::Slug).do_nothing().to_owned())
    .exec_without_returning(orm)
    .await?;

    let category = Categories::find()
        .filter(categories::Column::Slug.eq(slug))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("category {slug} missing after insert"))?;
    Ok(category.id)
}

async fn seed_menu(orm: &OrmConn) -> anyhow::Result<()> {
    let starters = ensure_category(orm, "starters", "Starters").await?;
    let mains = ensure_category(orm, "main-courses", "Main Courses").await?;
    let desserts = ensure_category(orm, "desserts", "Desserts").await?;

    let items = [
        ("Greek Salad", "12.99", true, starters),
        ("Bruschetta", "7.99", false, starters),
        ("Grilled Fish", "20.00", true, mains),
        ("Lemon Chicken", "17.50", false, mains),
        ("Lemon Dessert", "5.99", true, desserts),
    ];

    for (title, price, featured, category_id) in items {
        let exists = MenuItems::find()
            .filter(menu_items::Column::Title.eq(title))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        MenuItems::insert(menu_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            price: Set(Decimal::from_str(price)?),
            featured: Set(featured),
            category_id: Set(category_id),
            item_of_the_day: Set(false),
        })
        .exec_without_returning(orm)
        .await?;
    }

    tracing::info!("seeded menu");
    Ok(())
}
