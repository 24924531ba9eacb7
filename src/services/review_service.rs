use crate::{
    audit::log_audit,
    db::DbPool,
    dto::reviews::{CreateReviewRequest, ReviewList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
};

const COMMENT_MAX: usize = 1000;

pub async fn list_reviews(pool: &DbPool, product_id: i32) -> AppResult<ApiResponse<ReviewList>> {
    let items = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

/// Inserts a review and refreshes the product's denormalized rating summary
/// in the same transaction. One review per user per product; the
/// existence check is a plain read before the insert.
pub async fn add_review(
    pool: &DbPool,
    user: &AuthUser,
    product_id: i32,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    if payload
        .comment
        .as_deref()
        .is_some_and(|c| c.chars().count() > COMMENT_MAX)
    {
        return Err(AppError::Validation(format!(
            "comment must be at most {COMMENT_MAX} characters"
        )));
    }

    let mut txn = pool.begin().await?;

    let product: Option<(i32, bool)> =
        sqlx::query_as("SELECT id, is_active FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *txn)
            .await?;
    match product {
        Some((_, true)) => {}
        _ => return Err(AppError::NotFound),
    }

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE product_id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(payload.user_id)
            .fetch_optional(&mut *txn)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "you have already reviewed this product".into(),
        ));
    }

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (product_id, user_id, username, rating, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(payload.user_id)
    .bind(payload.username.as_str())
    .bind(payload.rating)
    .bind(payload.comment.as_deref())
    .fetch_one(&mut *txn)
    .await?;

    sqlx::query(
        r#"
        UPDATE products
        SET rating = COALESCE((SELECT AVG(rating)::real FROM reviews WHERE product_id = $1), 0),
            review_count = (SELECT COUNT(*)::int FROM reviews WHERE product_id = $1),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .execute(&mut *txn)
    .await?;

    txn.commit().await?;

    tracing::info!(product_id, user_id = payload.user_id, "review added");

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "review_add",
        Some("reviews"),
        Some(serde_json::json!({ "product_id": product_id, "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review added",
        review,
        Some(Meta::empty()),
    ))
}
