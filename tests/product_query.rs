use product_catalog_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{categories::CreateCategoryRequest, products::CreateProductRequest, reviews::CreateReviewRequest},
    middleware::auth::AuthUser,
    routes::params::{ProductFilter, ProductSortBy},
    services::{category_service, product_service, review_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, Statement};

// Seed a catalog and exercise the filter, sort and pagination engine.
#[tokio::test]
async fn filtering_sorting_and_pagination() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = AuthUser {
        user_id: 1,
        role: "Admin".into(),
    };

    let beverages = create_category(&state, &admin, "Beverages").await?;
    let snacks = create_category(&state, &admin, "Snacks").await?;

    // 45 beverages for the pagination contract
    for i in 0..45 {
        product_service::create_product(
            &state,
            &admin,
            CreateProductRequest {
                name: format!("Juice {i:02}"),
                price: format!("{}.50", i + 1).parse()?,
                category_id: Some(beverages.id),
                brand: Some("Fresh".into()),
                ..Default::default()
            },
        )
        .await?;
    }

    // Snacks with flags the filters can pick apart
    let chips = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Salted Chips".into(),
            price: "10.00".parse()?,
            discount_price: Some("8.00".parse()?),
            stock: 5,
            category_id: Some(snacks.id),
            brand: Some("Crunchy".into()),
            tags: Some("salty,party".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();

    product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Pretzels".into(),
            price: "4.00".parse()?,
            stock: 0,
            category_id: Some(snacks.id),
            brand: Some("Crunchy".into()),
            is_featured: true,
            description: "sugar free twist".into(),
            ..Default::default()
        },
    )
    .await?;

    // A soft-deleted product never shows up
    let ghost = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Ghost".into(),
            price: "9.99".parse()?,
            category_id: Some(snacks.id),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    product_service::delete_product(&state, &admin, ghost.id).await?;

    // category_id wins over the category name when both are supplied
    let page = product_service::list_filtered(
        &state,
        ProductFilter {
            category_id: Some(beverages.id),
            category: Some("Snacks".into()),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.clone().unwrap();
    assert_eq!(meta.total, Some(45));
    assert_eq!(meta.total_pages, Some(3));
    assert_eq!(meta.page, Some(1));
    assert_eq!(meta.per_page, Some(20));
    let items = page.data.unwrap().items;
    assert_eq!(items.len(), 20);
    assert!(items.iter().all(|p| p.category_id == Some(beverages.id)));

    // 45 rows at page size 20: page 3 holds the remaining 5
    let page3 = product_service::list_filtered(
        &state,
        ProductFilter {
            category_id: Some(beverages.id),
            page: Some(3),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(page3.data.unwrap().items.len(), 5);

    // Name-based category filter applies when no id is given
    let by_name = product_service::list_filtered(
        &state,
        ProductFilter {
            category: Some("Snacks".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_name.meta.unwrap().total, Some(2));

    // Conjunctive filters narrow step by step
    let crunchy = product_service::list_filtered(
        &state,
        ProductFilter {
            brand: Some("Crunchy".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(crunchy.meta.unwrap().total, Some(2));

    let crunchy_in_stock = product_service::list_filtered(
        &state,
        ProductFilter {
            brand: Some("Crunchy".into()),
            in_stock: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let items = crunchy_in_stock.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Salted Chips");

    let discounted = product_service::list_filtered(
        &state,
        ProductFilter {
            on_discount: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let items = discounted.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Salted Chips");

    let featured = product_service::list_filtered(
        &state,
        ProductFilter {
            is_featured: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let items = featured.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Pretzels");

    // Price band over the beverages
    let band = product_service::list_filtered(
        &state,
        ProductFilter {
            category_id: Some(beverages.id),
            min_price: Some("10.00".parse()?),
            max_price: Some("20.00".parse()?),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(band.meta.unwrap().total, Some(10));

    // Search hits name, description and tags
    let by_tag = product_service::list_filtered(
        &state,
        ProductFilter {
            search: Some("party".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_tag.data.unwrap().items[0].name, "Salted Chips");

    let by_description = product_service::list_filtered(
        &state,
        ProductFilter {
            search: Some("sugar".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_description.data.unwrap().items[0].name, "Pretzels");

    // Price ascending puts the cheapest juice first
    let cheap_first = product_service::list_filtered(
        &state,
        ProductFilter {
            sort_by: Some(ProductSortBy::PriceAsc),
            page_size: Some(5),
            ..Default::default()
        },
    )
    .await?;
    let items = cheap_first.data.unwrap().items;
    assert_eq!(items[0].price, "1.50".parse::<Decimal>()?);
    assert!(items.windows(2).all(|w| w[0].price <= w[1].price));

    // Rating sort surfaces the reviewed product
    let reviewer = AuthUser {
        user_id: 50,
        role: "Customer".into(),
    };
    review_service::add_review(
        &state.pool,
        &reviewer,
        chips.id,
        CreateReviewRequest {
            user_id: 50,
            username: "pat".into(),
            rating: 5,
            comment: None,
        },
    )
    .await?;
    let top_rated = product_service::list_filtered(
        &state,
        ProductFilter {
            sort_by: Some(ProductSortBy::Rating),
            page_size: Some(1),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(top_rated.data.unwrap().items[0].id, chips.id);

    Ok(())
}

async fn create_category(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
) -> anyhow::Result<product_catalog_api::models::Category> {
    let category = category_service::create_category(
        state,
        admin,
        CreateCategoryRequest {
            name: name.into(),
            description: None,
            image_url: None,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(category)
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run product query tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&database_url).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE reviews, products, categories, audit_logs RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(Some(AppState { pool, orm }))
}
