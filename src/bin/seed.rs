use rust_decimal::Decimal;

use product_catalog_api::{config::AppConfig, db::create_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_categories(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = vec![
        ("Beverages", "Juices, sodas and water"),
        ("Snacks", "Chips, nuts and sweets"),
        ("Electronics", "Gadgets and accessories"),
    ];

    for (name, description) in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Orange Juice 1L", "Beverages", "Fresh", "3.50", 120, true),
        ("Cola Six Pack", "Beverages", "Fizz", "5.99", 80, false),
        ("Salted Chips", "Snacks", "Crunchy", "2.25", 200, true),
        ("Trail Mix", "Snacks", "Crunchy", "4.75", 60, false),
        ("USB-C Cable", "Electronics", "Volt", "9.99", 45, false),
    ];

    for (name, category_name, brand, price, stock, is_featured) in products {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }

        let category: Option<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
            .bind(category_name)
            .fetch_optional(pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO products (name, price, stock, category_id, category_name, brand, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(name)
        .bind(price.parse::<Decimal>()?)
        .bind(stock)
        .bind(category.map(|(id,)| id))
        .bind(category_name)
        .bind(brand)
        .bind(is_featured)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
