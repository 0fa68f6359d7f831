pub mod auth_service;
pub mod category_service;
pub mod product_service;
pub mod rating_service;
pub mod review_service;
pub mod token_service;
