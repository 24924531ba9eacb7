use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
}

/// Listing filter. Every field is optional; filters combine conjunctively
/// and `category_id` takes precedence over `category` when both are given.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub category_id: Option<i32>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_featured: Option<bool>,
    pub on_discount: Option<bool>,
    pub in_stock: Option<bool>,
    pub sort_by: Option<ProductSortBy>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ProductFilter {
    /// Defaults only (page 1, page_size 20); out-of-range values pass
    /// through to the store untouched.
    pub fn paging(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(20);
        let offset = (page - 1) * page_size;
        (page, page_size, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeaturedQuery {
    pub count: Option<u64>,
}
