use rust_decimal::Decimal;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LikeExpr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::menu::{MenuItemList, MenuItemRequest, PatchMenuItemRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        categories::{Column as CategoryCol, Entity as Categories},
        menu_items::{ActiveModel, Column, Entity as MenuItems, Relation},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
    },
    error::{AppError, AppResult},
    models::{MenuItem, check_money},
    policy::{Action, Actor, authorize},
    response::{ApiResponse, Meta},
    routes::params::{MenuItemQuery, MenuOrdering},
    state::AppState,
};

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::bad_request("price must be greater than 0"));
    }
    check_money(price, "price")?;
    Ok(())
}

/// `ILIKE` pattern matching `needle` as a literal substring.
fn contains_pattern(needle: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\')
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::bad_request(format!(
            "category {category_id} does not exist"
        )));
    }
    Ok(())
}

pub async fn list_menu_items(
    state: &AppState,
    actor: &Actor,
    query: MenuItemQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    authorize(actor, Action::ReadCatalog)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        condition = condition
            .add(Expr::col((MenuItems, Column::Title)).ilike(contains_pattern(search)));
    }
    if let Some(featured) = query.featured {
        condition = condition.add(Column::Featured.eq(featured));
    }

    let mut finder = MenuItems::find();
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        finder = finder.join(JoinType::InnerJoin, Relation::Categories.def());
        condition = condition.add(
            Condition::any()
                .add(CategoryCol::Slug.eq(category.clone()))
                .add(Expr::col((Categories, CategoryCol::Title)).ilike(contains_pattern(category))),
        );
    }

    finder = finder.filter(condition);
    finder = match query.ordering {
        Some(MenuOrdering::PriceAsc) => finder.order_by_asc(Column::Price),
        Some(MenuOrdering::PriceDesc) => finder.order_by_desc(Column::Price),
        Some(MenuOrdering::TitleDesc) => finder.order_by_desc(Column::Title),
        Some(MenuOrdering::TitleAsc) | None => finder.order_by_asc(Column::Title),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(MenuItem::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Menu items", MenuItemList { items }, Some(meta)))
}

pub async fn get_menu_item(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::ReadCatalog)?;
    let item = MenuItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Menu item", item.into(), None))
}

pub async fn create_menu_item(
    state: &AppState,
    actor: &Actor,
    payload: MenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::WriteCatalog)?;
    validate_title(&payload.title)?;
    validate_price(payload.price)?;
    ensure_category(state, payload.category_id).await?;

    let item = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        price: Set(payload.price),
        featured: Set(payload.featured),
        category_id: Set(payload.category_id),
        item_of_the_day: Set(false),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(menuitem_id = %item.id, title = %item.title, "menu item created");
    audit::record(
        state,
        actor.user_id,
        "menuitem_create",
        "menu_items",
        serde_json::json!({ "menuitem_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item created",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn replace_menu_item(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: MenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::WriteCatalog)?;
    apply_update(
        state,
        actor,
        id,
        PatchMenuItemRequest {
            title: Some(payload.title),
            price: Some(payload.price),
            featured: Some(payload.featured),
            category_id: Some(payload.category_id),
        },
    )
    .await
}

pub async fn patch_menu_item(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: PatchMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::PatchCatalog)?;
    apply_update(state, actor, id, payload).await
}

async fn apply_update(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: PatchMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    let existing = MenuItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        validate_title(&title)?;
        active.title = Set(title);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
        active.category_id = Set(category_id);
    }

    let item = active.update(&state.orm).await?;

    audit::record(
        state,
        actor.user_id,
        "menuitem_update",
        "menu_items",
        serde_json::json!({ "menuitem_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu_item(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<()> {
    authorize(actor, Action::WriteCatalog)?;
    if MenuItems::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let in_carts = CartItems::find()
        .filter(CartCol::MenuitemId.eq(id))
        .count(&state.orm)
        .await?;
    let in_orders = OrderItems::find()
        .filter(OrderItemCol::MenuitemId.eq(id))
        .count(&state.orm)
        .await?;
    if in_carts + in_orders > 0 {
        return Err(AppError::bad_request(
            "Menu item is referenced by carts or orders",
        ));
    }

    MenuItems::delete_by_id(id).exec(&state.orm).await?;
    tracing::info!(menuitem_id = %id, "menu item deleted");
    audit::record(
        state,
        actor.user_id,
        "menuitem_delete",
        "menu_items",
        serde_json::json!({ "menuitem_id": id }),
    )
    .await;
    Ok(())
}

/// Make `id` the single item of the day.
///
/// Every caller locks all menu rows in id order before writing, so concurrent
/// selectors queue behind each other and the last commit wins with exactly one
/// flagged item.
pub async fn set_item_of_the_day(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::SetItemOfTheDay)?;

    let txn = state.orm.begin().await?;
    let locked: Vec<Uuid> = MenuItems::find()
        .select_only()
        .column(Column::Id)
        .order_by_asc(Column::Id)
        .lock(LockType::NoKeyUpdate)
        .into_tuple()
        .all(&txn)
        .await?;
    if !locked.contains(&id) {
        return Err(AppError::NotFound);
    }

    MenuItems::update_many()
        .col_expr(Column::ItemOfTheDay, Expr::col(Column::Id).eq(id))
        .exec(&txn)
        .await?;
    let item = MenuItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    txn.commit().await?;

    tracing::info!(menuitem_id = %item.id, title = %item.title, "item of the day set");
    audit::record(
        state,
        actor.user_id,
        "item_of_the_day",
        "menu_items",
        serde_json::json!({ "menuitem_id": item.id }),
    )
    .await;

    let message = format!("'{}' is now the item of the day", item.title);
    Ok(ApiResponse::success(message, item.into(), Some(Meta::empty())))
}

pub async fn get_item_of_the_day(
    state: &AppState,
    actor: &Actor,
) -> AppResult<ApiResponse<MenuItem>> {
    authorize(actor, Action::ReadCatalog)?;
    let item = MenuItems::find()
        .filter(Column::ItemOfTheDay.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Item of the day", item.into(), None))
}
