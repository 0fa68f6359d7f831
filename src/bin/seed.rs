use catalog_api::{
    db::{create_orm_conn, raw_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
    slug::slugify,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let orm = create_orm_conn(&database_url).await?;
    let pool = raw_pool(&orm);
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin123", Role::Admin).await?;
    let supplier_id = ensure_user(&pool, "supplier", "supplier123", Role::Supplier).await?;
    let customer_id = ensure_user(&pool, "customer", "customer123", Role::Customer).await?;
    let category_id = ensure_category(&pool, "Merchandise").await?;
    seed_products(&pool, supplier_id, category_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Supplier ID: {supplier_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<i32> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO users (first_name, last_name, username, email, hashed_password,
                           is_admin, is_supplier, is_customer)
        VALUES ($1, $2, $1, $3, $4, $5, $6, $7)
        ON CONFLICT (username) DO UPDATE
            SET is_admin = EXCLUDED.is_admin,
                is_supplier = EXCLUDED.is_supplier,
                is_customer = EXCLUDED.is_customer,
                is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(username)
    .bind("Seed")
    .bind(format!("{username}@example.com"))
    .bind(password_hash)
    .bind(role == Role::Admin)
    .bind(role == Role::Supplier)
    .bind(role == Role::Customer)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (role={role:?})");
    Ok(id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<i32> {
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO categories (name, slug)
        VALUES ($1, $2)
        ON CONFLICT (slug) DO UPDATE SET is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slugify(name))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool, supplier_id: i32, category_id: i32) -> anyhow::Result<()> {
    let products = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 5500, 50),
        ("Ferris Mug", "Coffee tastes better with Ferris", 1200, 100),
        ("Rust Sticker Pack", "Decorate your laptop", 500, 200),
    ];

    for (name, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (name, slug, description, price, stock, supplier_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(slugify(name))
        .bind(desc)
        .bind(price as i64)
        .bind(stock)
        .bind(supplier_id)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
