use catalog_api::db::{create_orm_conn, raw_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&raw_pool(&orm)).await?;
    println!("Migrations applied");
    Ok(())
}
