use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest},
    error::AppResult,
    middleware::auth::{AdminOnly, AnyRole, Authorized},
    models::UserProfile,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/", post(register))
        .route("/auth/login", post(login))
        .route("/auth/users/me", get(read_current_user))
        .route("/auth/add_supplier/{user_id}", patch(add_supplier))
        .route("/auth/revoke_supplier/{user_id}", patch(revoke_supplier))
        .route("/auth/add_customer/{user_id}", patch(add_customer))
        .route("/auth/delete_user/{user_id}", delete(delete_user))
}

#[utoipa::path(
    post,
    path = "/auth/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<UserProfile>),
        (status = 406, description = "Username or email already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials or no assigned role")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/auth/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Auth"
)]
pub async fn read_current_user(
    State(state): State<AppState>,
    auth: Authorized<AnyRole>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::current_user(&state, &auth.user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/auth/add_supplier/{user_id}",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User is now supplier", body = ApiResponse<UserProfile>),
        (status = 404, description = "No active user"),
        (status = 406, description = "Already a supplier")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Auth"
)]
pub async fn add_supplier(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::grant_supplier(&state, &auth.user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/auth/revoke_supplier/{user_id}",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User is no longer supplier", body = ApiResponse<UserProfile>),
        (status = 404, description = "No active user"),
        (status = 406, description = "Not a supplier")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Auth"
)]
pub async fn revoke_supplier(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::revoke_supplier(&state, &auth.user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/auth/add_customer/{user_id}",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User is now customer", body = ApiResponse<UserProfile>),
        (status = 404, description = "No active user"),
        (status = 406, description = "User already has a role")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Auth"
)]
pub async fn add_customer(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::grant_customer(&state, &auth.user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/auth/delete_user/{user_id}",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User is deleted"),
        (status = 404, description = "No active user")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Auth"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::deactivate_user(&state, &auth.user, user_id).await?;
    Ok(Json(resp))
}
