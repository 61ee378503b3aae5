use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorRes, StdResponse},
    app_state::AppState,
    extract::{AppJson, AppPath},
    models::OrderDetails,
};

/// Defines order routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(place_order))
            .routes(utoipa_axum::routes!(get_user_orders)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderReq {
    user_id: i64,
}

/// Check out the user's cart into a new order.
#[utoipa::path(
    post,
    path = "/place",
    tags = ["Orders"],
    request_body = PlaceOrderReq,
    responses(
        (status = 200, description = "Placed order successfully", body = StdResponse<OrderDetails, String>),
        (status = 422, description = "Cart is empty", body = ErrorRes)
    )
)]
async fn place_order(
    State(state): State<AppState>,
    AppJson(body): AppJson<PlaceOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let placed = state.orders.place_order(body.user_id).await?;

    Ok(StdResponse {
        data: Some(placed),
        message: Some("Placed order successfully"),
    })
}

/// Fetch all orders of a user, newest first.
#[utoipa::path(
    get,
    path = "/{user_id}",
    tags = ["Orders"],
    params(
        ("user_id" = i64, Path, description = "Owner of the orders")
    ),
    responses(
        (status = 200, description = "List user orders", body = StdResponse<Vec<OrderDetails>, String>)
    )
)]
async fn get_user_orders(
    AppPath(user_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.list_orders(user_id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get user orders successfully"),
    })
}
