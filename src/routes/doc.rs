use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reviews::{ReviewList, ReviewWithGrade, ReviewWithRating},
    },
    models::{Category, Product, Rating, Review, Role, Scope, UserProfile},
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, params, products, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::read_current_user,
        auth::add_supplier,
        auth::revoke_supplier,
        auth::add_customer,
        auth::delete_user,
        categories::get_all_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::all_products,
        products::product_by_category,
        products::product_detail,
        products::create_product,
        products::update_product,
        products::delete_product,
        reviews::all_reviews,
        reviews::products_reviews,
        reviews::add_review,
        reviews::delete_review
    ),
    components(
        schemas(
            UserProfile,
            Role,
            Scope,
            Category,
            Product,
            Rating,
            Review,
            Claims,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ReviewWithRating,
            ReviewWithGrade,
            ReviewList,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<UserProfile>,
            ApiResponse<LoginResponse>,
            ApiResponse<Category>,
            ApiResponse<CategoryList>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ReviewList>,
            ApiResponse<ReviewWithGrade>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and role management"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Reviews", description = "Review and rating endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
