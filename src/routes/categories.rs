use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    error::AppResult,
    middleware::auth::{AdminOnly, AnyRole, Authorized},
    models::Category,
    response::ApiResponse,
    services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(get_all_categories).post(create_category))
        .route(
            "/categories/{category_slug}",
            put(update_category).delete(delete_category),
        )
}

#[utoipa::path(
    get,
    path = "/categories/",
    responses(
        (status = 200, description = "Active categories", body = ApiResponse<CategoryList>)
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Categories"
)]
pub async fn get_all_categories(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/categories/",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 404, description = "Parent category not found"),
        (status = 406, description = "Category already present")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let resp = category_service::create_category(&state, &auth.user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/categories/{category_slug}",
    params(("category_slug" = String, Path, description = "Category slug")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 404, description = "There is no category found"),
        (status = 406, description = "Category already present")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(category_slug): Path<String>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp =
        category_service::update_category(&state, &auth.user, &category_slug, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/categories/{category_slug}",
    params(("category_slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "There is no category found")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(category_slug): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = category_service::delete_category(&state, &auth.user, &category_slug).await?;
    Ok(Json(resp))
}
