use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Rating, Review};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewWithRating {
    /// At least 10 characters.
    pub comment: String,
    /// Between 1 and 10.
    pub grade: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewWithGrade {
    pub review: Review,
    pub rating: Rating,
    /// Product rating after this review was counted.
    pub product_rating: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}
