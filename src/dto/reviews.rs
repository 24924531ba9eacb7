use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<Review>,
}
