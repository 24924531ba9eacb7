use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub sku: Option<String>,
    pub tags: Option<String>,
}

/// Partial update. Most fields only apply when supplied; the fields with
/// explicit-clear semantics (discount_price, color, size, material,
/// image_url, sku, tags) are written back verbatim, absent meaning clear.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sku: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStockRequest {
    pub quantity: i32,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
pub struct BrandList {
    pub items: Vec<String>,
}
