use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};

use crate::{
    dto::cart::{AddToCartRequest, CartList},
    error::AppResult,
    extract::ApiJson,
    middleware::auth::AuthUser,
    models::CartItem,
    response::ApiResponse,
    routes::orders,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/menu-items",
            get(cart_list).post(add_to_cart).delete(clear_cart),
        )
        // Customer-facing aliases of the order endpoints.
        .route(
            "/orders",
            get(orders::list_orders).post(orders::place_order),
        )
        .route(
            "/orders/{id}",
            patch(orders::update_order)
                .get(orders::get_order)
                .delete(orders::delete_order),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart/menu-items",
    responses(
        (status = 200, description = "Cart lines of the current user", body = ApiResponse<CartList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/menu-items",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Add or replace a cart line", body = ApiResponse<CartItem>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Menu item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartItem>>)> {
    let resp = cart_service::add_to_cart(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/menu-items",
    responses(
        (status = 204, description = "Cart cleared"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    cart_service::clear_cart(&state, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
