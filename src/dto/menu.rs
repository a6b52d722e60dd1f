use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, MenuItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchCategoryRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

/// Body for `POST` and `PUT` on menu items. `item_of_the_day` is not writable here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MenuItemRequest {
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub featured: bool,
    pub category_id: Uuid,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchMenuItemRequest {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct MenuItemList {
    #[schema(value_type = Vec<MenuItem>)]
    pub items: Vec<MenuItem>,
}
