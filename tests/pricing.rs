use chrono::Utc;
use product_catalog_api::entity::products;
use product_catalog_api::response::Meta;
use product_catalog_api::routes::params::ProductFilter;
use rust_decimal::Decimal;

fn sample_product(price: &str, discount: Option<&str>) -> products::Model {
    products::Model {
        id: 1,
        name: "Sample".into(),
        description: String::new(),
        price: price.parse().unwrap(),
        discount_price: discount.map(|d| d.parse().unwrap()),
        stock: 0,
        category_id: None,
        category_name: "General".into(),
        brand: "Generic".into(),
        color: None,
        size: None,
        material: None,
        image_url: None,
        rating: 0.0,
        review_count: 0,
        is_active: true,
        is_featured: false,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
        sku: None,
        tags: None,
    }
}

#[test]
fn final_price_prefers_discount() {
    let discounted = sample_product("100.00", Some("75.00"));
    assert_eq!(discounted.final_price(), Decimal::new(7500, 2));
    assert!(discounted.has_discount());

    let full = sample_product("100.00", None);
    assert_eq!(full.final_price(), Decimal::new(10000, 2));
    assert!(!full.has_discount());
}

#[test]
fn discount_percentage_rounds_to_whole_percent() {
    let quarter_off = sample_product("80.00", Some("60.00"));
    assert_eq!(quarter_off.discount_percentage(), Decimal::from(25));

    let third_off = sample_product("30.00", Some("20.00"));
    assert_eq!(third_off.discount_percentage(), Decimal::from(33));

    let full = sample_product("80.00", None);
    assert_eq!(full.discount_percentage(), Decimal::ZERO);
}

#[test]
fn meta_reports_page_count() {
    let meta = Meta::new(3, 20, 45);
    assert_eq!(meta.total, Some(45));
    assert_eq!(meta.total_pages, Some(3));

    let exact = Meta::new(1, 20, 40);
    assert_eq!(exact.total_pages, Some(2));

    let empty = Meta::new(1, 20, 0);
    assert_eq!(empty.total_pages, Some(0));
}

#[test]
fn filter_paging_defaults_without_clamping() {
    let filter = ProductFilter::default();
    assert_eq!(filter.paging(), (1, 20, 0));

    let filter = ProductFilter {
        page: Some(3),
        page_size: Some(20),
        ..Default::default()
    };
    assert_eq!(filter.paging(), (3, 20, 40));
}
