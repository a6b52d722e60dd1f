use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{cart_items, categories, menu_items, order_items, orders, users},
    error::{AppError, AppResult},
    lifecycle::OrderStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub featured: bool,
    pub category_id: Uuid,
    pub item_of_the_day: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub menuitem_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_crew_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menuitem_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_price: Decimal,
}

/// Largest amount a `NUMERIC(10, 2)` money column holds.
// 9_999_999_999 split into 32-bit parts (lo, mid, hi) at scale 2.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x540B_E3FF, 2, 0, false, 2);

/// Price of `quantity` units at `unit_price`.
pub fn line_price(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Reject amounts the money columns cannot store exactly: more than two
/// decimal places, or a magnitude above [`MAX_MONEY`].
pub fn check_money(amount: Decimal, what: &str) -> AppResult<Decimal> {
    if amount.normalize().scale() > 2 {
        return Err(AppError::bad_request(format!(
            "{what} must have at most 2 decimal places"
        )));
    }
    if amount.abs() > MAX_MONEY {
        return Err(AppError::bad_request(format!(
            "{what} must not exceed {MAX_MONEY}"
        )));
    }
    Ok(amount)
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            title: model.title,
        }
    }
}

impl From<menu_items::Model> for MenuItem {
    fn from(model: menu_items::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            price: model.price,
            featured: model.featured,
            category_id: model.category_id,
            item_of_the_day: model.item_of_the_day,
        }
    }
}

impl From<cart_items::Model> for CartItem {
    fn from(model: cart_items::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            menuitem_id: model.menuitem_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_price: model.line_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: orders::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            delivery_crew_id: model.delivery_crew_id,
            status: OrderStatus::from_stored(&model.status)?,
            total: model.total,
            date: model.date,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            menuitem_id: model.menuitem_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_price: model.line_price,
        }
    }
}
