use cart_service::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
};
use uuid::Uuid;

const PRODUCTS: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "Axum Hoodie",
        "Warm hoodie for Rustaceans",
        &[("S", 520000), ("M", 550000), ("L", 580000), ("XL", 610000)],
    ),
    (
        "Ferris T-Shirt",
        "Cotton tee with a crab on it",
        &[("S", 150000), ("M", 150000), ("L", 165000)],
    ),
    (
        "Tokio Cap",
        "One size fits most runtimes",
        &[("ONE", 90000)],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    for &(name, description, sizes) in PRODUCTS {
        let product_id = ensure_product(pool, name, description).await?;
        for &(size, value) in sizes {
            sqlx::query(
                r#"
                INSERT INTO prices (id, product_id, size, value)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, size) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(size)
            .bind(value)
            .execute(pool)
            .await?;
        }
        println!("Seeded {name} ({} sizes)", sizes.len());
    }

    println!("Seed completed");
    Ok(())
}

async fn ensure_product(
    pool: &sqlx::PgPool,
    name: &str,
    description: &str,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .fetch_optional(pool)
    .await?;

    // Existing products return no row on conflict
    let product_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM products WHERE name = $1")
                .bind(name)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    Ok(product_id)
}
