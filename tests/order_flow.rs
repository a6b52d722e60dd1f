mod common;

use little_lemon_api::{
    dto::cart::{AddToCartRequest, CartList, MenuItemRef},
    dto::orders::PlaceOrderRequest,
    entity::{cart_items, order_items, orders},
    error::AppError,
    lifecycle::OrderStatus,
    routes::params::OrderListQuery,
    services::{cart_service, order_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{add_to_cart, create_category, create_menu_item, create_user, dec, test_state};

// Two cart lines (10.00 x 2, 5.00 x 1) become one order of 25.00 with two lines; cart ends empty.
#[tokio::test]
async fn placing_an_order_consumes_the_cart() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let item_a = create_menu_item(&state, category, "10.00").await?;
    let item_b = create_menu_item(&state, category, "5.00").await?;

    add_to_cart(&state, &customer, &item_a, 2).await?;
    add_to_cart(&state, &customer, &item_b, 1).await?;

    let cart = cart_service::list_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, dec("25.00"));

    let placed = order_service::place_order(&state, &customer, PlaceOrderRequest::default())
        .await?
        .data
        .unwrap();

    assert_eq!(placed.order.id, placed.order_id);
    assert_eq!(placed.order.total, dec("25.00"));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.user_id, customer.user_id);
    assert!(placed.order.delivery_crew_id.is_none());
    assert_eq!(placed.items.len(), 2);

    let line_a = placed
        .items
        .iter()
        .find(|line| line.menuitem_id == item_a.id)
        .expect("line for item A");
    assert_eq!(line_a.quantity, 2);
    assert_eq!(line_a.unit_price, dec("10.00"));
    assert_eq!(line_a.line_price, dec("20.00"));

    let stored_lines = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(placed.order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored_lines, 2);

    let remaining = cart_items::Entity::find()
        .filter(cart_items::Column::UserId.eq(customer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(remaining, 0);

    let listed = order_service::list_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, placed.order_id);

    Ok(())
}

#[tokio::test]
async fn empty_cart_creates_no_order() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let result = order_service::place_order(&state, &customer, PlaceOrderRequest::default()).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let orders = orders::Entity::find()
        .filter(orders::Column::UserId.eq(customer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(orders, 0);

    Ok(())
}

// Lines keep the price from when they were added, even if the menu price changes later.
#[tokio::test]
async fn order_total_uses_cart_price_snapshot() -> anyhow::Result<()> {
    use little_lemon_api::entity::menu_items;
    use sea_orm::{ActiveModelTrait, Set};

    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let item = create_menu_item(&state, category, "8.50").await?;
    add_to_cart(&state, &customer, &item, 2).await?;

    let mut repriced: menu_items::ActiveModel = item.clone().into();
    repriced.price = Set(dec("99.00"));
    repriced.update(&state.orm).await?;

    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
    let placed = order_service::place_order(
        &state,
        &customer,
        PlaceOrderRequest { date: Some(date) },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(placed.order.total, dec("17.00"));
    assert_eq!(placed.order.date, date);

    Ok(())
}

#[tokio::test]
async fn cart_rejects_bad_quantities_and_unknown_items() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let item = create_menu_item(&state, category, "3.00").await?;

    let zero = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            menuitem: MenuItemRef::Id(item.id),
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let unknown = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            menuitem: MenuItemRef::Title("No Such Dish".into()),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound)));

    // Adding by title works and a second add replaces the line.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            menuitem: MenuItemRef::Title(item.title.clone()),
            quantity: 1,
        },
    )
    .await?;
    let line = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            menuitem: MenuItemRef::Id(item.id),
            quantity: 4,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(line.quantity, 4);
    assert_eq!(line.line_price, dec("12.00"));

    let removed = cart_service::clear_cart(&state, &customer).await?;
    assert_eq!(removed, 1);

    Ok(())
}

#[tokio::test]
async fn customers_cannot_read_each_others_orders() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, &[]).await?;
    let stranger = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let item = create_menu_item(&state, category, "4.25").await?;
    add_to_cart(&state, &owner, &item, 1).await?;

    let placed = order_service::place_order(&state, &owner, PlaceOrderRequest::default())
        .await?
        .data
        .unwrap();

    let own = order_service::get_order(&state, &owner, placed.order_id).await?;
    assert_eq!(own.data.unwrap().items.len(), 1);

    let foreign = order_service::get_order(&state, &stranger, placed.order_id).await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let listed = order_service::list_orders(&state, &stranger, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert!(listed.items.iter().all(|order| order.user_id == stranger.user_id));

    Ok(())
}

#[tokio::test]
async fn oversized_cart_line_is_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let item = create_menu_item(&state, category, "10.00").await?;

    let result = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            menuitem: MenuItemRef::Id(item.id),
            quantity: 2_000_000_000,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let lines = cart_items::Entity::find()
        .filter(cart_items::Column::UserId.eq(customer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(lines, 0);

    Ok(())
}

// Each line fits a money column but their sum does not: checkout fails inside the
// transaction and must leave the cart exactly as it was, with no order written.
#[tokio::test]
async fn failed_checkout_leaves_cart_and_orders_untouched() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, &[]).await?;
    let category = create_category(&state).await?;
    let mut menu_ids = Vec::new();
    for _ in 0..3 {
        let item = create_menu_item(&state, category, "90000.00").await?;
        add_to_cart(&state, &customer, &item, 1000).await?;
        menu_ids.push(item.id);
    }

    let cart_before = cart_service::list_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart_before.items.len(), 3);
    assert_eq!(cart_before.total, dec("270000000.00"));

    let result = order_service::place_order(&state, &customer, PlaceOrderRequest::default()).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let cart_after = cart_service::list_cart(&state, &customer).await?.data.unwrap();
    let snapshot = |cart: &CartList| -> Vec<(Uuid, i32)> {
        cart.items.iter().map(|line| (line.id, line.quantity)).collect()
    };
    assert_eq!(snapshot(&cart_after), snapshot(&cart_before));
    assert_eq!(cart_after.total, cart_before.total);

    let orders = orders::Entity::find()
        .filter(orders::Column::UserId.eq(customer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(orders, 0);

    let lines = order_items::Entity::find()
        .filter(order_items::Column::MenuitemId.is_in(menu_ids))
        .count(&state.orm)
        .await?;
    assert_eq!(lines, 0);

    Ok(())
}
