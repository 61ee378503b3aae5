use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorRes, StdResponse},
    app_state::AppState,
    extract::{AppJson, AppPath, AppQuery},
    models::{CreateProductEntity, ProductEntity},
};

/// Defines catalog routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products, create_product))
            .routes(utoipa_axum::routes!(get_product, update_product, delete_product))
            .routes(utoipa_axum::routes!(get_products_by_category)),
    )
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ProductsQuery {
    /// Only return products in this category.
    category: Option<String>,
}

/// Fetch all products, optionally filtered by category.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    params(ProductsQuery),
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(
    AppQuery(query): AppQuery<ProductsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog.list_products(query.category).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// Fetch products of one category.
#[utoipa::path(
    get,
    path = "/category/{category}",
    tags = ["Products"],
    params(
        ("category" = String, Path, description = "Category to list")
    ),
    responses(
        (status = 200, description = "List products in category", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products_by_category(
    AppPath(category): AppPath<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog.list_products(Some(category)).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i64, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "No such product", body = ErrorRes)
    )
)]
async fn get_product(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.get_product(id).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Get product successfully"),
    })
}

/// Add a product to the catalog.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    request_body = CreateProductEntity,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Blank name or negative price", body = ErrorRes)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.create_product(body).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Created product successfully"),
    })
}

/// Replace an existing product.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i64, Path, description = "Product ID to replace")
    ),
    request_body = CreateProductEntity,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "No such product", body = ErrorRes)
    )
)]
async fn update_product(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.update_product(id, body).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Updated product successfully"),
    })
}

/// Delete a product that no cart or order references.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i64, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted product successfully", body = StdResponse<String, String>),
        (status = 404, description = "No such product", body = ErrorRes),
        (status = 409, description = "Product is still referenced", body = ErrorRes)
    )
)]
async fn delete_product(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_product(id).await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Deleted product successfully"),
    })
}
