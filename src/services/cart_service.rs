use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartList, MenuItemRef},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        menu_items::{Column as MenuCol, Entity as MenuItems, Model as MenuItemModel},
    },
    error::{AppError, AppResult},
    models::{CartItem, check_money, line_price},
    policy::{Action, Actor, authorize},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_cart(state: &AppState, actor: &Actor) -> AppResult<ApiResponse<CartList>> {
    authorize(actor, Action::UseCart)?;
    let items: Vec<CartItem> = CartItems::find()
        .filter(CartCol::UserId.eq(actor.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CartItem::from)
        .collect();

    let total: Decimal = items.iter().map(|item| item.line_price).sum();
    let meta = Meta::single_page(items.len());
    Ok(ApiResponse::success("OK", CartList { items, total }, Some(meta)))
}

async fn resolve_menu_item(state: &AppState, menuitem: &MenuItemRef) -> AppResult<MenuItemModel> {
    let found = match menuitem {
        MenuItemRef::Id(id) => MenuItems::find_by_id(*id).one(&state.orm).await?,
        MenuItemRef::Title(title) => {
            MenuItems::find()
                .filter(MenuCol::Title.eq(title.trim()))
                .one(&state.orm)
                .await?
        }
    };
    found.ok_or(AppError::NotFound)
}

/// Put `quantity` of a menu item in the caller's cart, snapshotting its current price.
/// A second add of the same item replaces the line.
pub async fn add_to_cart(
    state: &AppState,
    actor: &Actor,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    authorize(actor, Action::UseCart)?;
    if payload.quantity <= 0 {
        return Err(AppError::bad_request("quantity must be greater than 0"));
    }

    let menu_item = resolve_menu_item(state, &payload.menuitem).await?;
    let unit_price = menu_item.price;
    let line_total = check_money(line_price(unit_price, payload.quantity), "line price")?;

    let line = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.user_id),
        menuitem_id: Set(menu_item.id),
        quantity: Set(payload.quantity),
        unit_price: Set(unit_price),
        line_price: Set(line_total),
        created_at: Set(Utc::now().into()),
    };

    let cart_item = CartItems::insert(line)
        .on_conflict(
            OnConflict::columns([CartCol::UserId, CartCol::MenuitemId])
                .update_columns([CartCol::Quantity, CartCol::UnitPrice, CartCol::LinePrice])
                .to_owned(),
        )
        .exec_with_returning(&state.orm)
        .await?;

    tracing::debug!(
        user_id = %actor.user_id,
        menuitem_id = %menu_item.id,
        quantity = payload.quantity,
        "cart line stored"
    );
    audit::record(
        state,
        actor.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "menuitem_id": menu_item.id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Item added to cart", cart_item.into(), None))
}

/// Remove every line from the caller's cart. Returns how many were removed.
pub async fn clear_cart(state: &AppState, actor: &Actor) -> AppResult<u64> {
    authorize(actor, Action::UseCart)?;
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(actor.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected > 0 {
        audit::record(
            state,
            actor.user_id,
            "cart_clear",
            "cart_items",
            serde_json::json!({ "removed": result.rows_affected }),
        )
        .await;
    }
    Ok(result.rows_affected)
}
