use product_catalog_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        categories::CreateCategoryRequest,
        products::{CreateProductRequest, UpdateProductRequest},
        reviews::CreateReviewRequest,
    },
    entity::products::Entity as Products,
    error::AppError,
    middleware::auth::AuthUser,
    services::{category_service, product_service, review_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, EntityTrait, Statement};

// Full catalog flow: categories, products, reviews, the denormalized rating
// and the two-level cascade delete.
#[tokio::test]
async fn category_product_review_lifecycle() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = AuthUser {
        user_id: 1,
        role: "Admin".into(),
    };
    let customer = AuthUser {
        user_id: 7,
        role: "Customer".into(),
    };

    // Duplicate names are rejected case-insensitively
    let snacks = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "Snacks".into(),
            description: None,
            image_url: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(snacks.product_count, 0);

    let duplicate = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "snacks".into(),
            description: None,
            image_url: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::DuplicateName(_))));

    // A linked product gets the category name cached onto it
    let chips = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Chips".into(),
            price: "10.00".parse()?,
            category_id: Some(snacks.id),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(chips.category_name, "Snacks");
    assert_eq!(chips.brand, "Generic");
    assert_eq!(chips.rating, 0.0);
    assert_eq!(chips.review_count, 0);

    // An unknown category name stays a literal with no id link
    let soda = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Soda".into(),
            price: "5.00".parse()?,
            category_name: Some("Drinks".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(soda.category_name, "Drinks");
    assert_eq!(soda.category_id, None);

    // A dangling category id is rejected
    let bad_link = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Orphan".into(),
            price: "1.00".parse()?,
            category_id: Some(9999),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_link, Err(AppError::NotFound)));

    // First review sets the aggregate
    review_service::add_review(
        &state.pool,
        &customer,
        chips.id,
        CreateReviewRequest {
            user_id: 7,
            username: "maria".into(),
            rating: 4,
            comment: None,
        },
    )
    .await?;
    let chips_after = product_service::get_product(&state, chips.id)
        .await?
        .data
        .unwrap();
    assert_eq!(chips_after.rating, 4.0);
    assert_eq!(chips_after.review_count, 1);

    // A second user moves the mean
    review_service::add_review(
        &state.pool,
        &customer,
        chips.id,
        CreateReviewRequest {
            user_id: 8,
            username: "jose".into(),
            rating: 5,
            comment: Some("crunchy".into()),
        },
    )
    .await?;
    let chips_after = product_service::get_product(&state, chips.id)
        .await?
        .data
        .unwrap();
    assert!((chips_after.rating - 4.5).abs() < f32::EPSILON);
    assert_eq!(chips_after.review_count, 2);

    // The same user cannot review twice
    let again = review_service::add_review(
        &state.pool,
        &customer,
        chips.id,
        CreateReviewRequest {
            user_id: 7,
            username: "maria".into(),
            rating: 1,
            comment: None,
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    // Out-of-range ratings never reach the store
    let invalid = review_service::add_review(
        &state.pool,
        &customer,
        chips.id,
        CreateReviewRequest {
            user_id: 9,
            username: "ana".into(),
            rating: 6,
            comment: None,
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    // The category now counts one active product
    let snacks_after = category_service::get_category(&state, snacks.id)
        .await?
        .data
        .unwrap();
    assert_eq!(snacks_after.product_count, 1);

    // discount_price follows explicit-clear semantics: omitting it on a
    // later update clears it
    product_service::update_product(
        &state,
        &admin,
        chips.id,
        UpdateProductRequest {
            discount_price: Some("8.00".parse()?),
            ..Default::default()
        },
    )
    .await?;
    let discounted = product_service::get_product(&state, chips.id)
        .await?
        .data
        .unwrap();
    assert!(discounted.has_discount);
    assert_eq!(discounted.final_price, "8.00".parse()?);
    assert_eq!(discounted.discount_percentage, "20".parse()?);

    product_service::update_product(
        &state,
        &admin,
        chips.id,
        UpdateProductRequest {
            stock: Some(3),
            ..Default::default()
        },
    )
    .await?;
    let cleared = product_service::get_product(&state, chips.id)
        .await?
        .data
        .unwrap();
    assert!(!cleared.has_discount);
    assert_eq!(cleared.stock, 3);
    assert_eq!(cleared.final_price, "10.00".parse()?);

    // A name-only category update rewrites the cached name but keeps the link
    product_service::update_product(
        &state,
        &admin,
        chips.id,
        UpdateProductRequest {
            category_name: Some("Munchies".into()),
            ..Default::default()
        },
    )
    .await?;
    let drifted = product_service::get_product(&state, chips.id)
        .await?
        .data
        .unwrap();
    assert_eq!(drifted.category_name, "Munchies");
    assert_eq!(drifted.category_id, Some(snacks.id));

    // Deleting the category takes its products and their reviews with it
    category_service::delete_category(&state, &admin, snacks.id).await?;
    assert!(matches!(
        product_service::get_product(&state, chips.id).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        category_service::get_category(&state, snacks.id).await,
        Err(AppError::NotFound)
    ));
    let reviews = review_service::list_reviews(&state.pool, chips.id)
        .await?
        .data
        .unwrap();
    assert!(reviews.items.is_empty());

    // The unlinked product is untouched by the cascade
    let soda_after = product_service::get_product(&state, soda.id)
        .await?
        .data
        .unwrap();
    assert_eq!(soda_after.category_name, "Drinks");

    // Soft delete is not the cascade: the row survives with is_active unset
    product_service::delete_product(&state, &admin, soda.id).await?;
    assert!(matches!(
        product_service::get_product(&state, soda.id).await,
        Err(AppError::NotFound)
    ));
    let soda_row = Products::find_by_id(soda.id)
        .one(&state.orm)
        .await?
        .expect("soft-deleted row kept");
    assert!(!soda_row.is_active);

    // Reviews against inactive products are refused
    let on_inactive = review_service::add_review(
        &state.pool,
        &customer,
        soda.id,
        CreateReviewRequest {
            user_id: 7,
            username: "maria".into(),
            rating: 3,
            comment: None,
        },
    )
    .await;
    assert!(matches!(on_inactive, Err(AppError::NotFound)));

    // Mutations require the Admin role
    let forbidden = product_service::create_product(
        &state,
        &customer,
        CreateProductRequest {
            name: "Sneaky".into(),
            price: "1.00".parse()?,
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run catalog flow tests."
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
