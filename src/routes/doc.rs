use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartList, MenuItemRef},
        groups::{AddMemberRequest, GroupMembers, Membership},
        menu::{
            CategoryList, CategoryRequest, MenuItemList, MenuItemRequest, PatchCategoryRequest,
            PatchMenuItemRequest,
        },
        orders::{OrderList, OrderWithItems, PlaceOrderRequest, PlacedOrder, UpdateOrderRequest},
    },
    lifecycle::{OrderStatus, StatusInput},
    models::{CartItem, Category, MenuItem, Order, OrderItem, User},
    policy::Role,
    response::Meta,
    routes::{cart, categories, groups, health, menu_items, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        menu_items::list_menu_items,
        menu_items::create_menu_item,
        menu_items::get_menu_item,
        menu_items::replace_menu_item,
        menu_items::patch_menu_item,
        menu_items::delete_menu_item,
        menu_items::set_item_of_the_day,
        menu_items::get_item_of_the_day,
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        categories::replace_category,
        categories::patch_category,
        categories::delete_category,
        cart::cart_list,
        cart::add_to_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        groups::list_members,
        groups::add_member,
        groups::remove_member
    ),
    components(
        schemas(
            User,
            Category,
            MenuItem,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            StatusInput,
            Role,
            CategoryRequest,
            PatchCategoryRequest,
            CategoryList,
            MenuItemRequest,
            PatchMenuItemRequest,
            MenuItemList,
            MenuItemRef,
            AddToCartRequest,
            CartList,
            PlaceOrderRequest,
            UpdateOrderRequest,
            OrderWithItems,
            PlacedOrder,
            OrderList,
            AddMemberRequest,
            GroupMembers,
            Membership,
            params::Pagination,
            params::MenuItemQuery,
            params::OrderListQuery,
            Meta
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Menu", description = "Menu item endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Groups", description = "Staff group membership"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_order_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/orders/{id}"));
        assert!(
            doc.paths
                .paths
                .contains_key("/api/menu-items/{id}/set-item-of-the-day")
        );
    }
}
