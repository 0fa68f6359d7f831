use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};

use crate::{
    audit,
    dto::reviews::{ReviewList, ReviewWithGrade, ReviewWithRating},
    entity::{
        ratings::{ActiveModel as RatingActive, Column as RatingCol, Entity as Ratings, Model as RatingModel},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, Model as ReviewModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Rating, Review},
    response::{ApiResponse, Meta},
    services::{product_service, rating_service},
    state::AppState,
};

pub const MIN_COMMENT_LEN: usize = 10;
pub const GRADE_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

pub async fn list_reviews(state: &AppState) -> AppResult<ApiResponse<ReviewList>> {
    let items: Vec<Review> = Reviews::find()
        .filter(ReviewCol::IsActive.eq(true))
        .order_by_desc(ReviewCol::CommentDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn product_reviews(state: &AppState, slug: &str) -> AppResult<ApiResponse<ReviewList>> {
    let product = product_service::find_active_by_slug(&state.orm, slug, false).await?;
    let items: Vec<Review> = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::ProductId.eq(product.id))
                .add(ReviewCol::IsActive.eq(true)),
        )
        .order_by_desc(ReviewCol::CommentDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Store a customer's grade and review of a product.
///
/// The product row is locked for the whole transaction, so reviews of one
/// product serialize. The grade is inserted first so the review can reference
/// its id; both rows and the recomputed product rating commit together or not
/// at all. A second grade for the same (user, product), active or not, is
/// refused.
pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    payload: ReviewWithRating,
) -> AppResult<ApiResponse<ReviewWithGrade>> {
    validate_review(&payload)?;

    let txn = state.orm.begin().await?;
    // Lock the product before the grade insert takes its foreign-key share lock.
    let product = product_service::find_active_by_slug(&txn, slug, true).await?;

    let rating = RatingActive {
        id: NotSet,
        grade: Set(f64::from(payload.grade)),
        user_id: Set(Some(user.user_id)),
        product_id: Set(Some(product.id)),
        is_active: Set(true),
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateReview,
        _ => err.into(),
    })?;

    let product_rating = rating_service::recalculate_rating(&txn, product.id).await?;

    let review = ReviewActive {
        id: NotSet,
        user_id: Set(Some(user.user_id)),
        product_id: Set(Some(product.id)),
        rating_id: Set(rating.id),
        comment: Set(payload.comment),
        comment_date: NotSet,
        is_active: Set(true),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        product_id = product.id,
        rating_id = rating.id,
        product_rating,
        "review added"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_add",
        "reviews",
        serde_json::json!({ "review_id": review.id, "rating_id": rating.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review added",
        ReviewWithGrade {
            review: review_from_entity(review),
            rating: rating_from_entity(rating),
            product_rating,
        },
        Some(Meta::empty()),
    ))
}

/// Deactivate a grade together with its review and recompute the product rating.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    rating_id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let rating = Ratings::find_by_id(rating_id)
        .filter(RatingCol::IsActive.eq(true))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let rating = match rating {
        Some(r) => r,
        None => return Err(AppError::NotFound("No active rating found".into())),
    };
    let product_id = rating.product_id;

    let mut active: RatingActive = rating.into();
    active.is_active = Set(false);
    active.update(&txn).await?;

    Reviews::update_many()
        .col_expr(ReviewCol::IsActive, Expr::value(false))
        .filter(ReviewCol::RatingId.eq(rating_id))
        .exec(&txn)
        .await?;

    let product_rating = match product_id {
        Some(id) => Some(rating_service::recalculate_rating(&txn, id).await?),
        None => None,
    };

    txn.commit().await?;

    tracing::info!(rating_id, ?product_id, ?product_rating, "review deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_delete",
        "reviews",
        serde_json::json!({ "rating_id": rating_id, "deleted_at": Utc::now() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({ "rating_id": rating_id, "product_rating": product_rating }),
        Some(Meta::empty()),
    ))
}

pub fn validate_review(payload: &ReviewWithRating) -> AppResult<()> {
    if payload.comment.trim().chars().count() < MIN_COMMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "comment must be at least {MIN_COMMENT_LEN} characters"
        )));
    }
    if !GRADE_RANGE.contains(&payload.grade) {
        return Err(AppError::BadRequest("grade must be between 1 and 10".into()));
    }
    Ok(())
}

fn rating_from_entity(model: RatingModel) -> Rating {
    Rating {
        id: model.id,
        grade: model.grade,
        user_id: model.user_id,
        product_id: model.product_id,
        is_active: model.is_active,
    }
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        rating_id: model.rating_id,
        comment: model.comment,
        comment_date: model.comment_date.with_timezone(&Utc),
        is_active: model.is_active,
    }
}
