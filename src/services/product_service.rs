use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, Scope},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    services::{category_service, rating_service::EMPTY_RATING},
    slug::slugify,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let sort_by = query.sort_by.unwrap_or(ProductSortBy::Name);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Asc);
    let sort_col = match sort_by {
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Rating => Column::Rating,
    };

    let mut finder = Products::find().filter(on_sale());
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    paginate(state, finder.order_by_asc(Column::Id), &query.pagination(), "Products").await
}

/// Products of the category and of its direct subcategories.
pub async fn list_by_category(
    state: &AppState,
    category_slug: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let category = category_service::find_active_by_slug(&state.orm, category_slug).await?;
    let category_ids = category_service::with_subcategories(&state.orm, category.id).await?;

    let finder = Products::find()
        .filter(on_sale().add(Column::CategoryId.is_in(category_ids)))
        .order_by_asc(Column::Name)
        .order_by_asc(Column::Id);

    paginate(state, finder, &pagination, "Products").await
}

pub async fn get_product(state: &AppState, slug: &str) -> AppResult<ApiResponse<Product>> {
    let product = find_active_by_slug(&state.orm, slug, false).await?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let slug = slug_for(&payload.name)?;
    validate_amounts(Some(payload.price), Some(payload.stock))?;

    let txn = state.orm.begin().await?;
    ensure_slug_free(&txn, &slug, None).await?;
    if let Some(category_id) = payload.category_id {
        category_service::find_active_by_id(&txn, category_id).await?;
    }

    let supplier_id = user.has_scope(Scope::Supplier).then_some(user.user_id);
    let product = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        slug: Set(slug),
        description: Set(payload.description),
        price: Set(payload.price),
        image_url: Set(payload.image_url),
        stock: Set(payload.stock),
        supplier_id: Set(supplier_id),
        category_id: Set(payload.category_id),
        rating: Set(EMPTY_RATING),
        is_active: Set(true),
    }
    .insert(&txn)
    .await
    .map_err(slug_conflict)?;
    txn.commit().await?;

    tracing::info!(product_id = product.id, supplier_id = ?product.supplier_id, "product created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }
    validate_amounts(payload.price, payload.stock)?;

    let txn = state.orm.begin().await?;
    let existing = find_active_by_slug(&txn, slug, true).await?;
    ensure_owner(user, &existing)?;
    let product_id = existing.id;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let new_slug = slug_for(&name)?;
        ensure_slug_free(&txn, &new_slug, Some(product_id)).await?;
        active.name = Set(name);
        active.slug = Set(new_slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        category_service::find_active_by_id(&txn, category_id).await?;
        active.category_id = Set(Some(category_id));
    }

    let product = active.update(&txn).await.map_err(slug_conflict)?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product update is successful",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let existing = find_active_by_slug(&txn, slug, true).await?;
    ensure_owner(user, &existing)?;
    let product_id = existing.id;

    let mut active: ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::done("Product delete is successful"))
}

/// Suppliers may only change their own products; admins may change any.
pub fn ensure_owner(user: &AuthUser, product: &ProductModel) -> AppResult<()> {
    if user.has_scope(Scope::Supplier) && product.supplier_id != Some(user.user_id) {
        return Err(AppError::Forbidden(
            "You are not authorized to use this method".into(),
        ));
    }
    Ok(())
}

pub(crate) async fn find_active_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    for_update: bool,
) -> AppResult<ProductModel> {
    let mut finder = Products::find().filter(
        Condition::all()
            .add(Column::Slug.eq(slug))
            .add(Column::IsActive.eq(true)),
    );
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("No product found".into()))
}

fn on_sale() -> Condition {
    Condition::all()
        .add(Column::IsActive.eq(true))
        .add(Column::Stock.gt(0))
}

async fn paginate(
    state: &AppState,
    finder: Select<Products>,
    pagination: &Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(message, ProductList { items }, Some(meta)))
}

async fn ensure_slug_free<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    except: Option<i32>,
) -> AppResult<()> {
    let mut condition = Condition::all().add(Column::Slug.eq(slug));
    if let Some(id) = except {
        condition = condition.add(Column::Id.ne(id));
    }
    if Products::find().filter(condition).one(db).await?.is_some() {
        return Err(AppError::Conflict("Product already present".into()));
    }
    Ok(())
}

fn validate_amounts(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}

fn slug_for(name: &str) -> AppResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::BadRequest("name must contain letters or digits".into()));
    }
    Ok(slug)
}

fn slug_conflict(err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Product already present".into())
        }
        _ => err.into(),
    }
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        price: model.price,
        image_url: model.image_url,
        stock: model.stock,
        supplier_id: model.supplier_id,
        category_id: model.category_id,
        rating: model.rating,
        is_active: model.is_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(supplier_id: Option<i32>) -> ProductModel {
        ProductModel {
            id: 1,
            name: "Ferris Mug".into(),
            slug: "ferris-mug".into(),
            description: "Coffee tastes better with Ferris".into(),
            price: 1200,
            image_url: None,
            stock: 3,
            supplier_id,
            category_id: None,
            rating: EMPTY_RATING,
            is_active: true,
        }
    }

    fn caller(user_id: i32, scope: Scope) -> AuthUser {
        AuthUser {
            user_id,
            username: format!("user{user_id}"),
            scopes: vec![scope],
        }
    }

    #[test]
    fn supplier_may_only_touch_own_products() {
        assert!(ensure_owner(&caller(5, Scope::Supplier), &product(Some(5))).is_ok());
        assert!(matches!(
            ensure_owner(&caller(6, Scope::Supplier), &product(Some(5))),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_owner(&caller(6, Scope::Supplier), &product(None)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_may_touch_any_product() {
        assert!(ensure_owner(&caller(1, Scope::Admin), &product(Some(5))).is_ok());
        assert!(ensure_owner(&caller(1, Scope::Admin), &product(None)).is_ok());
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(validate_amounts(Some(-1), None).is_err());
        assert!(validate_amounts(None, Some(-3)).is_err());
        assert!(validate_amounts(Some(0), Some(0)).is_ok());
    }
}
