use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use sea_orm::sea_query::LockType;

use crate::entity::{
    products::{ActiveModel as ProductActive, Entity as Products},
    ratings::{Column as RatingCol, Entity as Ratings},
};

/// Rating stored on a product that has no active grades.
pub const EMPTY_RATING: f64 = 0.0;

/// Mean of `grades` rounded to two decimals, or [`EMPTY_RATING`] for none.
pub fn aggregate(grades: &[f64]) -> f64 {
    if grades.is_empty() {
        return EMPTY_RATING;
    }
    let mean = grades.iter().sum::<f64>() / grades.len() as f64;
    round2(mean)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recompute `products.rating` from the product's active grades.
///
/// Must run on the same transaction as the grade insert or deactivation that
/// triggered it. The product row is locked first, so concurrent recomputes for
/// one product serialize and each one sees the grades committed before it.
pub async fn recalculate_rating<C: ConnectionTrait>(db: &C, product_id: i32) -> Result<f64, DbErr> {
    let product = Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("product {product_id}")))?;

    let grades: Vec<f64> = Ratings::find()
        .select_only()
        .column(RatingCol::Grade)
        .filter(
            Condition::all()
                .add(RatingCol::ProductId.eq(product_id))
                .add(RatingCol::IsActive.eq(true)),
        )
        .into_tuple::<f64>()
        .all(db)
        .await?;

    let rating = aggregate(&grades);
    if product.rating != rating {
        let mut active: ProductActive = product.into();
        active.rating = Set(rating);
        active.update(db).await?;
    }

    tracing::debug!(product_id, grades = grades.len(), rating, "product rating recalculated");
    Ok(rating)
}
