mod common;

use little_lemon_api::{
    entity::menu_items,
    error::AppError,
    policy::Role,
    services::menu_service,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{create_category, create_menu_item, create_user, test_state};

// The flag is global, so every check on it lives in this one test.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_item_of_the_day() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let manager = create_user(&state, &[Role::Manager]).await?;
    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let first = create_menu_item(&state, category, "7.00").await?;
    let second = create_menu_item(&state, category, "9.00").await?;

    let denied = menu_service::set_item_of_the_day(&state, &customer, first.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    menu_service::set_item_of_the_day(&state, &manager, first.id).await?;
    let chosen = menu_service::set_item_of_the_day(&state, &manager, second.id)
        .await?
        .data
        .expect("chosen item");
    assert_eq!(chosen.id, second.id);
    assert!(chosen.item_of_the_day);

    let flagged = menu_items::Entity::find()
        .filter(menu_items::Column::ItemOfTheDay.eq(true))
        .all(&state.orm)
        .await?;
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].id, second.id);

    let missing = menu_service::set_item_of_the_day(&state, &manager, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let still = menu_items::Entity::find()
        .filter(menu_items::Column::ItemOfTheDay.eq(true))
        .count(&state.orm)
        .await?;
    assert_eq!(still, 1);

    let current = menu_service::get_item_of_the_day(&state, &customer)
        .await?
        .data
        .expect("current item");
    assert_eq!(current.id, second.id);

    // Simultaneous selectors on different items queue up; none fails.
    let mut contenders = Vec::new();
    for price in ["3.00", "4.00", "5.00", "6.00", "7.00", "8.00"] {
        contenders.push(create_menu_item(&state, category, price).await?.id);
    }
    for _ in 0..5 {
        let mut handles = Vec::new();
        for id in contenders.iter().copied() {
            let state = state.clone();
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                menu_service::set_item_of_the_day(&state, &manager, id).await
            }));
        }
        for handle in handles {
            let result = handle.await?;
            assert!(result.is_ok(), "selector failed: {:?}", result.err());
        }

        let flagged = menu_items::Entity::find()
            .filter(menu_items::Column::ItemOfTheDay.eq(true))
            .all(&state.orm)
            .await?;
        assert_eq!(flagged.len(), 1);
        assert!(contenders.contains(&flagged[0].id));
    }

    Ok(())
}
