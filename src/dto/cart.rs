use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartItem;

/// A menu item named either by id or by its exact title.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MenuItemRef {
    Id(Uuid),
    Title(String),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub menuitem: MenuItemRef,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartItem>,
    pub total: Decimal,
}
