use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::AppResult,
    middleware::auth::{AdminOrSupplier, AnyRole, Authorized},
    models::Product,
    response::ApiResponse,
    routes::params::{Pagination, ProductQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/", get(all_products).post(create_product))
        .route("/products/category/{category_slug}", get(product_by_category))
        .route("/products/detail/{product_slug}", get(product_detail))
        .route(
            "/products/{product_slug}",
            put(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/products/",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("sort_by" = Option<String>, Query, description = "Sort by: name, price, rating"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Active products in stock", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Products"
)]
pub async fn all_products(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/products/category/{category_slug}",
    params(
        ("category_slug" = String, Path, description = "Category slug"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Products of a category and its subcategories", body = ApiResponse<ProductList>),
        (status = 404, description = "There is no category found")
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Products"
)]
pub async fn product_by_category(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
    Path(category_slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_by_category(&state, &category_slug, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/products/detail/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "No product found")
    ),
    security(("bearer_auth" = ["admin", "supplier", "customer"])),
    tag = "Products"
)]
pub async fn product_detail(
    State(state): State<AppState>,
    _auth: Authorized<AnyRole>,
    Path(product_slug): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, &product_slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/products/",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 406, description = "Product already present")
    ),
    security(("bearer_auth" = ["admin", "supplier"])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth: Authorized<AdminOrSupplier>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &auth.user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/products/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Product belongs to another supplier"),
        (status = 404, description = "No product found"),
        (status = 406, description = "Product already present")
    ),
    security(("bearer_auth" = ["admin", "supplier"])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    auth: Authorized<AdminOrSupplier>,
    Path(product_slug): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &auth.user, &product_slug, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/products/{product_slug}",
    params(("product_slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 403, description = "Product belongs to another supplier"),
        (status = 404, description = "No product found")
    ),
    security(("bearer_auth" = ["admin", "supplier"])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    auth: Authorized<AdminOrSupplier>,
    Path(product_slug): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &auth.user, &product_slug).await?;
    Ok(Json(resp))
}
