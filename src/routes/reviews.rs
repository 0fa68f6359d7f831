use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::reviews::{ReviewList, ReviewWithGrade, ReviewWithRating},
    error::AppResult,
    middleware::auth::{AdminOnly, AnyRole, Authorized, CustomerOnly},
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews/", get(all_reviews))
        .route(
            "/reviews/product/{product_slug}",
            get(products_reviews).post(add_review),
        )
        .route("/reviews/{rating_id}", delete(delete_review))
}

#[utoipa::path(
    get,
    path = "/reviews/",
    responses(
        (status = 200, description = "Active reviews", body = ApiResponse<ReviewList>)
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Reviews"
)]
pub async fn all_reviews(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_reviews(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/reviews/product/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Active reviews of a product", body = ApiResponse<ReviewList>),
        (status = 404, description = "No product found")
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Reviews"
)]
pub async fn products_reviews(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
    Path(product_slug): Path<String>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::product_reviews(&state, &product_slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/reviews/product/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    request_body = ReviewWithRating,
    responses(
        (status = 201, description = "Review added", body = ApiResponse<ReviewWithGrade>),
        (status = 404, description = "No product found"),
        (status = 406, description = "Review by user already posted")
    ),
    security(("bearer_auth" = ["customer"])),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    auth: Authorized<CustomerOnly>,
    Path(product_slug): Path<String>,
    Json(payload): Json<ReviewWithRating>,
) -> AppResult<(StatusCode, Json<ApiResponse<ReviewWithGrade>>)> {
    let resp = review_service::add_review(&state, &auth.user, &product_slug, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/reviews/{rating_id}",
    params(("rating_id" = i32, Path, description = "Rating ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 404, description = "No active rating found")
    ),
    security(("bearer_auth" = ["admin"])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    auth: Authorized<AdminOnly>,
    Path(rating_id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_review(&state, &auth.user, rating_id).await?;
    Ok(Json(resp))
}
