use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;

use crate::{
    audit,
    dto::categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    entity::categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Category,
    response::{ApiResponse, Meta},
    slug::slugify,
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let slug = slug_for(&payload.name)?;

    let txn = state.orm.begin().await?;
    ensure_slug_free(&txn, &slug, None).await?;
    if let Some(parent_id) = payload.parent_id {
        find_active_by_id(&txn, parent_id).await?;
    }

    let category = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        slug: Set(slug),
        is_active: Set(true),
        parent_id: Set(payload.parent_id),
    }
    .insert(&txn)
    .await
    .map_err(slug_conflict)?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    if payload.name.is_none() && payload.parent_id.is_none() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }

    let txn = state.orm.begin().await?;
    let existing = find_active_by_slug(&txn, slug).await?;
    let category_id = existing.id;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let new_slug = slug_for(&name)?;
        ensure_slug_free(&txn, &new_slug, Some(category_id)).await?;
        active.name = Set(name);
        active.slug = Set(new_slug);
    }
    if let Some(parent_id) = payload.parent_id {
        if parent_id == category_id {
            return Err(AppError::BadRequest("category cannot be its own parent".into()));
        }
        find_active_by_id(&txn, parent_id).await?;
        active.parent_id = Set(Some(parent_id));
    }

    let category = active.update(&txn).await.map_err(slug_conflict)?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category update is successful",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let existing = find_active_by_slug(&txn, slug).await?;
    let category_id = existing.id;

    let mut active: ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": category_id }),
    )
    .await;

    Ok(ApiResponse::done("Category delete is successful"))
}

pub(crate) async fn find_active_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> AppResult<CategoryModel> {
    Categories::find()
        .filter(
            Condition::all()
                .add(Column::Slug.eq(slug))
                .add(Column::IsActive.eq(true)),
        )
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no category found".into()))
}

pub(crate) async fn find_active_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no category found".into()))
}

/// The category with `category_id` and its direct children.
pub(crate) async fn with_subcategories<C: ConnectionTrait>(
    db: &C,
    category_id: i32,
) -> AppResult<Vec<i32>> {
    let mut ids: Vec<i32> = Categories::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::ParentId.eq(category_id))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    ids.push(category_id);
    Ok(ids)
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
    let clash = Categories::find().filter(condition).one(db).await?;
    if clash.is_some() {
        return Err(AppError::Conflict("Category already present".into()));
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
            AppError::Conflict("Category already present".into())
        }
        _ => err.into(),
    }
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
        is_active: model.is_active,
    }
}
