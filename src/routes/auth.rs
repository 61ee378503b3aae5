use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorRes, StdResponse},
    app_state::AppState,
    extract::{AppJson, AppPath},
    models::UserEntity,
};

/// Defines signup/login routes and user lookup with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .nest(
            "/api/auth",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(signup))
                .routes(utoipa_axum::routes!(login)),
        )
        .nest(
            "/api/users",
            OpenApiRouter::new().routes(utoipa_axum::routes!(get_user)),
        )
}

/// Public view of a user.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRes {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for UserRes {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct CredentialsReq {
    email: String,
    password: String,
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/signup",
    tags = ["Auth"],
    request_body = CredentialsReq,
    responses(
        (status = 200, description = "Signed up successfully", body = StdResponse<UserRes, String>),
        (status = 400, description = "Malformed email or empty password", body = ErrorRes),
        (status = 409, description = "Email already exists", body = ErrorRes)
    )
)]
async fn signup(
    State(state): State<AppState>,
    AppJson(body): AppJson<CredentialsReq>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .credentials
        .register(&body.email, &body.password)
        .await?;

    Ok(StdResponse {
        data: Some(UserRes::from(user)),
        message: Some("Signed up successfully"),
    })
}

/// Check an email/password pair.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = CredentialsReq,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<UserRes, String>),
        (status = 401, description = "Wrong password", body = ErrorRes),
        (status = 404, description = "No user with this email", body = ErrorRes)
    )
)]
async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<CredentialsReq>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.credentials.login(&body.email, &body.password).await?;

    Ok(StdResponse {
        data: Some(UserRes::from(user)),
        message: Some("Logged in successfully"),
    })
}

/// Fetch a user by id.
#[utoipa::path(
    get,
    path = "/{user_id}",
    tags = ["Auth"],
    params(
        ("user_id" = i64, Path, description = "User ID to fetch")
    ),
    responses(
        (status = 200, description = "Get user successfully", body = StdResponse<UserRes, String>),
        (status = 404, description = "No such user", body = ErrorRes)
    )
)]
async fn get_user(
    AppPath(user_id): AppPath<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.credentials.get_user(user_id).await?;

    Ok(StdResponse {
        data: Some(UserRes::from(user)),
        message: Some("Get user successfully"),
    })
}
