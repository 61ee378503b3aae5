pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::Router;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, swagger};

/// All API routes with their OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth::routes_with_openapi())
        .merge(products::routes_with_openapi())
        .merge(cart::routes_with_openapi())
        .merge(orders::routes_with_openapi())
}

/// The complete application: API routes plus Swagger UI, bound to `state`.
pub fn app(state: AppState) -> Router {
    let (routes, mut openapi) = routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Shop Backend API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    routes
        .merge(swagger::create_swagger_ui(openapi))
        .with_state(state)
}
