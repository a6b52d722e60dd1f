use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest, PlacedOrder, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle::{OrderStatus, crew_transition, manager_transition},
    models::{Order, OrderItem, check_money},
    policy::{Action, Actor, OrderAccess, OrderScope, Role, authorize},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::group_service::holds_role,
    state::AppState,
};

fn access_of(order: &OrderModel) -> OrderAccess {
    OrderAccess {
        owner: order.user_id,
        delivery_crew: order.delivery_crew_id,
    }
}

pub async fn list_orders(
    state: &AppState,
    actor: &Actor,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    authorize(actor, Action::ListOrders)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = match actor.order_scope() {
        OrderScope::All => Condition::all(),
        OrderScope::AssignedTo(crew) => Condition::all().add(OrderCol::DeliveryCrewId.eq(crew)),
        OrderScope::OwnedBy(owner) => Condition::all().add(OrderCol::UserId.eq(owner)),
    };
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::bad_request(format!("Invalid status filter '{status}'")))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize(actor, Action::ReadOrder(access_of(&order)))?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::try_from(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Turn the caller's cart into an order.
///
/// Reading the cart, inserting the order and its lines, and deleting the
/// consumed cart lines happen in one transaction; any failure rolls all of it
/// back and leaves the cart untouched.
pub async fn place_order(
    state: &AppState,
    actor: &Actor,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    authorize(actor, Action::PlaceOrder)?;

    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(actor.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::bad_request("Cart is empty"));
    }

    // Lines carry the price snapshotted when they were added.
    let total: Decimal = lines.iter().map(|line| line.line_price).sum();
    check_money(total, "order total")?;
    let now = Utc::now();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.user_id),
        delivery_crew_id: Set(None),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total: Set(total),
        date: Set(payload.date.unwrap_or_else(|| now.date_naive())),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menuitem_id: Set(line.menuitem_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_price: Set(line.line_price),
        }
        .insert(&txn)
        .await?;
        items.push(item.into());
    }

    let consumed: Vec<Uuid> = lines.iter().map(|line| line.id).collect();
    let removed = CartItems::delete_many()
        .filter(CartCol::Id.is_in(consumed))
        .exec(&txn)
        .await?;
    if removed.rows_affected != lines.len() as u64 {
        return Err(AppError::Internal(anyhow::anyhow!(
            "cart changed during checkout: expected {} lines, removed {}",
            lines.len(),
            removed.rows_affected
        )));
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %actor.user_id,
        lines = items.len(),
        total = %order.total,
        "order placed"
    );
    audit::record(
        state,
        actor.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    let order_id = order.id;
    Ok(ApiResponse::success(
        "Order placed",
        PlacedOrder {
            order_id,
            order: Order::try_from(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Assign delivery crew and/or move the status of an order.
pub async fn update_order(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize(actor, Action::UpdateOrderStatus(access_of(&order)))?;

    if payload.delivery_crew.is_none() && payload.status.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let current = OrderStatus::from_stored(&order.status)?;
    let mut active: OrderActive = order.into();

    if let Some(crew_id) = payload.delivery_crew {
        authorize(actor, Action::AssignDeliveryCrew)?;
        if Users::find_by_id(crew_id).one(&txn).await?.is_none() {
            return Err(AppError::NotFound);
        }
        if !holds_role(&txn, crew_id, Role::DeliveryCrew).await? {
            return Err(AppError::bad_request("User is not in delivery crew"));
        }
        active.delivery_crew_id = Set(Some(crew_id));
    }

    if let Some(input) = payload.status.as_ref() {
        let next = if actor.is_manager() {
            manager_transition(input)?
        } else {
            crew_transition(current, input)?
        };
        active.status = Set(next.as_str().to_string());
    }

    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        delivery_crew = ?order.delivery_crew_id,
        "order updated"
    );
    audit::record(
        state,
        actor.user_id,
        "order_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "status": order.status,
            "delivery_crew": order.delivery_crew_id,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::try_from(order)?,
        Some(Meta::empty()),
    ))
}

/// Remove an order together with its lines.
pub async fn delete_order(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<()> {
    authorize(actor, Action::DeleteOrder)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order deleted");
    audit::record(
        state,
        actor.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;
    Ok(())
}
