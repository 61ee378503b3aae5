use axum::{extract::State, response::IntoResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorRes, StdResponse},
    app_state::AppState,
    extract::{AppJson, AppPath},
    models::CartItemEntity,
};

/// Defines cart routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart_items))
            .routes(utoipa_axum::routes!(get_cart_total))
            .routes(utoipa_axum::routes!(add_to_cart))
            .routes(utoipa_axum::routes!(remove_from_cart))
            .routes(utoipa_axum::routes!(clear_cart)),
    )
}

/// Fetch all items currently in a user's cart.
#[utoipa::path(
    get,
    path = "/{user_id}",
    tags = ["Cart"],
    params(
        ("user_id" = i64, Path, description = "Owner of the cart")
    ),
    responses(
        (status = 200, description = "List cart items", body = StdResponse<Vec<CartItemEntity>, String>)
    )
)]
async fn get_cart_items(
    AppPath(user_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.cart.list_items(user_id).await?;

    Ok(StdResponse {
        data: Some(items),
        message: Some("Get cart items successfully"),
    })
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CartTotalRes {
    user_id: i64,
    #[schema(value_type = String, example = "25.00")]
    total: BigDecimal,
}

/// Sum of unit price times quantity over a user's cart.
#[utoipa::path(
    get,
    path = "/{user_id}/total",
    tags = ["Cart"],
    params(
        ("user_id" = i64, Path, description = "Owner of the cart")
    ),
    responses(
        (status = 200, description = "Cart total", body = StdResponse<CartTotalRes, String>)
    )
)]
async fn get_cart_total(
    AppPath(user_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let total = state.cart.cart_total(user_id).await?;

    Ok(StdResponse {
        data: Some(CartTotalRes { user_id, total }),
        message: Some("Get cart total successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AddToCartReq {
    user_id: i64,
    product_id: i64,
    quantity: i32,
}

/// Add a product to a user's cart as a new line item.
#[utoipa::path(
    post,
    path = "/add",
    tags = ["Cart"],
    request_body = AddToCartReq,
    responses(
        (status = 200, description = "Added item to cart", body = StdResponse<CartItemEntity, String>),
        (status = 400, description = "Quantity is not positive", body = ErrorRes),
        (status = 404, description = "User or product does not exist", body = ErrorRes)
    )
)]
async fn add_to_cart(
    State(state): State<AppState>,
    AppJson(body): AppJson<AddToCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .cart
        .add_item(body.user_id, body.product_id, body.quantity)
        .await?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Added item to cart successfully"),
    })
}

/// Remove one item from its cart. Unknown ids are ignored.
#[utoipa::path(
    delete,
    path = "/remove/{cart_item_id}",
    tags = ["Cart"],
    params(
        ("cart_item_id" = i64, Path, description = "Cart item ID to remove")
    ),
    responses(
        (status = 200, description = "Item removed", body = StdResponse<String, String>)
    )
)]
async fn remove_from_cart(
    AppPath(cart_item_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.cart.remove_item(cart_item_id).await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Item removed from cart successfully"),
    })
}

/// Remove every item from a user's cart.
#[utoipa::path(
    delete,
    path = "/clear/{user_id}",
    tags = ["Cart"],
    params(
        ("user_id" = i64, Path, description = "Owner of the cart")
    ),
    responses(
        (status = 200, description = "Cart cleared", body = StdResponse<String, String>)
    )
)]
async fn clear_cart(
    AppPath(user_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.cart.clear_cart(user_id).await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Cart cleared successfully"),
    })
}
