use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Active products only; soft-deleted products are not counted.
    pub product_count: i64,
}

/// Display form of a product: the stored row plus the owning category's
/// image and the computed price fields.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i32,
    pub category_id: Option<i32>,
    pub category_name: String,
    pub category_image_url: Option<String>,
    pub brand: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub image_url: Option<String>,
    pub rating: f32,
    pub review_count: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sku: Option<String>,
    pub tags: Option<String>,
    pub final_price: Decimal,
    pub discount_percentage: Decimal,
    pub has_discount: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
