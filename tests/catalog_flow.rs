use std::sync::Arc;

use catalog_api::{
    config::TokenSettings,
    db::{create_orm_conn, raw_pool, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        categories::{CreateCategoryRequest, UpdateCategoryRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reviews::ReviewWithRating,
    },
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
        ratings::Entity as Ratings,
        reviews::{Column as ReviewCol, Entity as Reviews},
        users::ActiveModel as UserActive,
    },
    error::{AppError, AuthError},
    middleware::auth::{AdminOnly, AcceptedScopes, AdminOrSupplier, AnyRole, AuthUser},
    models::{Product, Role, Scope},
    response::ApiResponse,
    routes::params::Pagination,
    services::{
        auth_service, category_service, product_service, rating_service::EMPTY_RATING,
        review_service, token_service::TokenService,
    },
    state::AppState,
};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

const PASSWORD: &str = "correct horse battery staple";

// Registration -> admin role grant -> login -> supplier creates a product.
#[tokio::test]
async fn registered_user_needs_a_role_before_login() -> anyhow::Result<()> {
    let Some(state) = try_state().await? else {
        return Ok(());
    };
    let tag = unique_tag();
    let admin = create_user(&state, &format!("admin_{tag}"), Grant::Admin).await?;

    let username = format!("newbie_{tag}");
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            first_name: "New".into(),
            last_name: "Bie".into(),
            username: username.clone(),
            email: format!("{username}@example.com"),
            password: PASSWORD.into(),
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(registered.role, None);

    // Same username again is refused.
    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            first_name: "New".into(),
            last_name: "Bie".into(),
            username: username.clone(),
            email: format!("other_{username}@example.com"),
            password: PASSWORD.into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let err = login(&state, &username, PASSWORD).await.expect_err("no role yet");
    assert_eq!(err.auth_error(), Some(AuthError::NoAssignedRole));

    let err = login(&state, &username, "wrong password").await.expect_err("bad password");
    assert_eq!(err.auth_error(), Some(AuthError::BadCredentials));

    let err = login(&state, &format!("ghost_{tag}"), PASSWORD).await.expect_err("unknown user");
    assert_eq!(err.auth_error(), Some(AuthError::UserNotFound));

    auth_service::grant_supplier(&state, &admin, registered.id).await?;
    let again = auth_service::grant_supplier(&state, &admin, registered.id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let token = login(&state, &username, PASSWORD).await?;
    let supplier =
        auth_service::authorize(&state.orm, &state.tokens, &token, AdminOrSupplier::SCOPES).await?;
    assert_eq!(supplier.user_id, registered.id);
    assert_eq!(supplier.scopes, vec![Scope::Supplier]);

    // Supplier token is not accepted on an admin-only route.
    let denied = auth_service::authorize(&state.orm, &state.tokens, &token, AdminOnly::SCOPES)
        .await
        .expect_err("supplier is not admin");
    assert_eq!(denied.auth_error(), Some(AuthError::InsufficientScope));

    let product = product_service::create_product(
        &state,
        &supplier,
        CreateProductRequest {
            name: format!("Supplier Lamp {tag}"),
            description: "Warm light for late reading".into(),
            price: 4500,
            image_url: None,
            stock: 4,
            category_id: None,
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(product.supplier_id, Some(registered.id));
    assert_eq!(product.rating, EMPTY_RATING);

    // Revoking the supplier role leaves a customer behind.
    let demoted = auth_service::revoke_supplier(&state, &admin, registered.id)
        .await?
        .data
        .expect("profile");
    assert_eq!(demoted.role, Some(Role::Customer));

    Ok(())
}

// Reviews keep the product rating equal to the rounded mean of its active grades.
#[tokio::test]
async fn reviews_drive_the_product_rating() -> anyhow::Result<()> {
    let Some(state) = try_state().await? else {
        return Ok(());
    };
    let tag = unique_tag();
    let admin = create_user(&state, &format!("radmin_{tag}"), Grant::Admin).await?;
    let alice = create_user(&state, &format!("alice_{tag}"), Grant::Customer).await?;
    let bob = create_user(&state, &format!("bob_{tag}"), Grant::Customer).await?;
    let carol = create_user(&state, &format!("carol_{tag}"), Grant::Customer).await?;

    let slug = format!("review-mug-{tag}");
    let product = insert_product(&state, &slug).await?;

    let first = add_review(&state, &alice, &slug, 8).await?;
    assert_eq!(first.product_rating, 8.0);
    assert_eq!(first.review.rating_id, first.rating.id);

    let duplicate = add_review(&state, &alice, &slug, 3).await;
    assert!(matches!(duplicate, Err(AppError::DuplicateReview)));
    assert_eq!(stored_rating(&state, product.id).await?, 8.0);

    let second = add_review(&state, &bob, &slug, 5).await?;
    assert_eq!(second.product_rating, 6.5);

    let third = add_review(&state, &carol, &slug, 10).await?;
    assert_eq!(third.product_rating, 7.67);
    assert_eq!(stored_rating(&state, product.id).await?, 7.67);

    let listed = review_service::product_reviews(&state, &slug)
        .await?
        .data
        .expect("reviews");
    assert_eq!(listed.items.len(), 3);

    // Deleting alice's grade leaves (5 + 10) / 2.
    review_service::delete_review(&state, &admin, first.rating.id).await?;
    assert_eq!(stored_rating(&state, product.id).await?, 7.5);

    let rating = Ratings::find_by_id(first.rating.id)
        .one(&state.orm)
        .await?
        .expect("rating row kept");
    assert!(!rating.is_active);
    let review = Reviews::find()
        .filter(ReviewCol::RatingId.eq(first.rating.id))
        .one(&state.orm)
        .await?
        .expect("review row kept");
    assert!(!review.is_active);

    // A deactivated grade still counts as the user's one grade for this product.
    let retry = add_review(&state, &alice, &slug, 9).await;
    assert!(matches!(retry, Err(AppError::DuplicateReview)));

    let gone = review_service::delete_review(&state, &admin, first.rating.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    review_service::delete_review(&state, &admin, second.rating.id).await?;
    review_service::delete_review(&state, &admin, third.rating.id).await?;
    assert_eq!(stored_rating(&state, product.id).await?, EMPTY_RATING);

    let listed = review_service::product_reviews(&state, &slug)
        .await?
        .data
        .expect("reviews");
    assert!(listed.items.is_empty());

    Ok(())
}

// A customer token is refused on supplier routes and accepted everywhere AnyRole is.
#[tokio::test]
async fn customer_scope_is_checked_per_route() -> anyhow::Result<()> {
    let Some(state) = try_state().await? else {
        return Ok(());
    };
    let tag = unique_tag();
    let customer = create_user(&state, &format!("cust_{tag}"), Grant::Customer).await?;
    let token = login(&state, &customer.username, PASSWORD).await?;

    let user = auth_service::authorize(&state.orm, &state.tokens, &token, AnyRole::SCOPES).await?;
    assert_eq!(user.scopes, vec![Scope::Customer]);

    let denied =
        auth_service::authorize(&state.orm, &state.tokens, &token, AdminOrSupplier::SCOPES)
            .await
            .expect_err("customer is not a supplier");
    assert_eq!(denied.auth_error(), Some(AuthError::InsufficientScope));

    // A token naming another user's id is not honoured.
    let forged = state
        .tokens
        .issue(&customer.username, customer.user_id + 100_000, vec![Scope::Customer])?;
    let err = auth_service::authorize(&state.orm, &state.tokens, &forged, AnyRole::SCOPES)
        .await
        .expect_err("id mismatch");
    assert_eq!(err.auth_error(), Some(AuthError::CredentialsInvalid));

    Ok(())
}

// Two customers reviewing one product at the same time both succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reviews_of_one_product_serialize() -> anyhow::Result<()> {
    let Some(state) = try_state().await? else {
        return Ok(());
    };
    let tag = unique_tag();
    let alice = create_user(&state, &format!("calice_{tag}"), Grant::Customer).await?;
    let bob = create_user(&state, &format!("cbob_{tag}"), Grant::Customer).await?;

    for round in 0..20 {
        let slug = format!("busy-mug-{tag}-{round}");
        let product = insert_product(&state, &slug).await?;

        let (first, second) = tokio::join!(
            add_review(&state, &alice, &slug, 4),
            add_review(&state, &bob, &slug, 9),
        );
        first?;
        second?;

        assert_eq!(stored_rating(&state, product.id).await?, 6.5, "round {round}");
    }

    Ok(())
}

// Category and product management through the services.
#[tokio::test]
async fn categories_and_product_ownership() -> anyhow::Result<()> {
    let Some(state) = try_state().await? else {
        return Ok(());
    };
    let tag = unique_tag();
    let admin = create_user(&state, &format!("cadmin_{tag}"), Grant::Admin).await?;
    let owner = create_user(&state, &format!("owner_{tag}"), Grant::Supplier).await?;
    let rival = create_user(&state, &format!("rival_{tag}"), Grant::Supplier).await?;

    let kitchen = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: format!("Kitchen {tag}"),
            parent_id: None,
        },
    )
    .await?
    .data
    .expect("category");
    assert_eq!(kitchen.slug, format!("kitchen-{tag}"));

    let clash = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: format!("kitchen  {tag}!"),
            parent_id: None,
        },
    )
    .await;
    assert!(matches!(clash, Err(AppError::Conflict(_))));

    let orphan = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: format!("Orphan {tag}"),
            parent_id: Some(i32::MAX),
        },
    )
    .await;
    assert!(matches!(orphan, Err(AppError::NotFound(_))));

    let mugs = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: format!("Kitchen Mugs {tag}"),
            parent_id: Some(kitchen.id),
        },
    )
    .await?
    .data
    .expect("subcategory");
    assert_eq!(mugs.parent_id, Some(kitchen.id));

    let own_parent = category_service::update_category(
        &state,
        &admin,
        &kitchen.slug,
        UpdateCategoryRequest {
            name: None,
            parent_id: Some(kitchen.id),
        },
    )
    .await;
    assert!(matches!(own_parent, Err(AppError::BadRequest(_))));

    let kettle = create_supplier_product(&state, &owner, &format!("Kettle {tag}"), kitchen.id).await?;
    let mug = create_supplier_product(&state, &owner, &format!("Mug {tag}"), mugs.id).await?;

    // The parent lists its own products and those of direct subcategories.
    let in_kitchen = product_ids(
        product_service::list_by_category(&state, &kitchen.slug, Pagination::default()).await?,
    );
    assert!(in_kitchen.contains(&kettle.id));
    assert!(in_kitchen.contains(&mug.id));
    let in_mugs = product_ids(
        product_service::list_by_category(&state, &mugs.slug, Pagination::default()).await?,
    );
    assert_eq!(in_mugs, vec![mug.id]);

    // Suppliers may not touch each other's products.
    let restock = || UpdateProductRequest {
        stock: Some(1),
        ..Default::default()
    };
    let denied = product_service::update_product(&state, &rival, &kettle.slug, restock()).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    let denied = product_service::delete_product(&state, &rival, &kettle.slug).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let updated = product_service::update_product(&state, &owner, &kettle.slug, restock())
        .await?
        .data
        .expect("product");
    assert_eq!(updated.stock, 1);

    product_service::delete_product(&state, &admin, &kettle.slug).await?;
    let gone = product_service::get_product(&state, &kettle.slug).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    // Soft-deleted categories disappear from listings and lookups.
    category_service::delete_category(&state, &admin, &mugs.slug).await?;
    let listed = category_service::list_categories(&state)
        .await?
        .data
        .expect("categories");
    assert!(listed.items.iter().all(|c| c.id != mugs.id));
    assert!(listed.items.iter().any(|c| c.id == kitchen.id));

    let missing =
        product_service::list_by_category(&state, &mugs.slug, Pagination::default()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    let again = category_service::delete_category(&state, &admin, &mugs.slug).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    Ok(())
}

enum Grant {
    Admin,
    Supplier,
    Customer,
}

async fn try_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run catalog flow tests.");
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    let pool = raw_pool(&orm);
    run_migrations(&pool).await?;

    let settings = TokenSettings::new("flow-test-secret", Algorithm::HS256, Duration::minutes(30))?;
    Ok(Some(AppState {
        pool,
        orm,
        tokens: Arc::new(TokenService::new(&settings)),
    }))
}

// Tests share one database, so every row they create carries a unique suffix.
fn unique_tag() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

async fn create_user(state: &AppState, username: &str, grant: Grant) -> anyhow::Result<AuthUser> {
    let hashed_password = auth_service::hash_password(PASSWORD)?;
    let (is_admin, is_supplier, is_customer, scope) = match grant {
        Grant::Admin => (true, false, false, Scope::Admin),
        Grant::Supplier => (false, true, false, Scope::Supplier),
        Grant::Customer => (false, false, true, Scope::Customer),
    };
    let user = UserActive {
        id: NotSet,
        first_name: Set("Test".into()),
        last_name: Set("User".into()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        hashed_password: Set(hashed_password),
        is_active: Set(true),
        is_admin: Set(is_admin),
        is_supplier: Set(is_supplier),
        is_customer: Set(is_customer),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        scopes: vec![scope],
    })
}

async fn login(state: &AppState, username: &str, password: &str) -> Result<String, AppError> {
    let resp = auth_service::login_user(
        state,
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        },
    )
    .await?;
    Ok(resp.data.map(|d| d.access_token).unwrap_or_default())
}

async fn add_review(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    grade: i32,
) -> Result<catalog_api::dto::reviews::ReviewWithGrade, AppError> {
    let resp = review_service::add_review(
        state,
        user,
        slug,
        ReviewWithRating {
            comment: format!("Graded this mug a {grade} out of ten"),
            grade,
        },
    )
    .await?;
    Ok(resp.data.expect("review"))
}

async fn stored_rating(state: &AppState, product_id: i32) -> anyhow::Result<f64> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product");
    Ok(product.rating)
}

async fn insert_product(state: &AppState, slug: &str) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: NotSet,
        name: Set(format!("Product {slug}")),
        slug: Set(slug.to_string()),
        description: Set("A mug that gets reviewed".into()),
        price: Set(1200),
        image_url: Set(None),
        stock: Set(10),
        supplier_id: Set(None),
        category_id: Set(None),
        rating: Set(EMPTY_RATING),
        is_active: Set(true),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

async fn create_supplier_product(
    state: &AppState,
    supplier: &AuthUser,
    name: &str,
    category_id: i32,
) -> anyhow::Result<Product> {
    let resp = product_service::create_product(
        state,
        supplier,
        CreateProductRequest {
            name: name.to_string(),
            description: "Stocked by a test supplier".into(),
            price: 2500,
            image_url: None,
            stock: 3,
            category_id: Some(category_id),
        },
    )
    .await?;
    Ok(resp.data.expect("product"))
}

fn product_ids(resp: ApiResponse<ProductList>) -> Vec<i32> {
    resp.data
        .map(|list| list.items.into_iter().map(|p| p.id).collect())
        .unwrap_or_default()
}
