use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    entity::{
        categories::{
            ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories,
            Model as CategoryModel,
        },
        products::{Column as ProductCol, Entity as Products},
        reviews::{Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

const NAME_MAX: usize = 50;
const TEXT_MAX: usize = 200;

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let categories = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?;

    let counts = active_product_counts(state).await?;
    let items = categories
        .into_iter()
        .map(|category| {
            let product_count = counts.get(&category.id).copied().unwrap_or(0);
            category_from_entity(category, product_count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_category(state: &AppState, id: i32) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find_by_id(id).one(&state.orm).await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let product_count = count_active_products(state, id).await?;
    Ok(ApiResponse::success(
        "Category",
        category_from_entity(category, product_count),
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    validate_name(&payload.name)?;
    validate_optional_len("description", payload.description.as_deref(), TEXT_MAX)?;
    validate_optional_len("image_url", payload.image_url.as_deref(), TEXT_MAX)?;

    if find_by_name_ci(state, &payload.name, None).await?.is_some() {
        return Err(AppError::DuplicateName(payload.name));
    }

    let category = CategoryActive {
        id: NotSet,
        name: Set(payload.name),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = category.id, name = %category.name, "category created");

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category, 0),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    if let Some(name) = payload.name.as_deref().filter(|n| !n.is_empty()) {
        if name != existing.name {
            validate_name(name)?;
            if find_by_name_ci(state, name, Some(id)).await?.is_some() {
                return Err(AppError::DuplicateName(name.to_string()));
            }
        }
    }
    validate_optional_len("description", payload.description.as_deref(), TEXT_MAX)?;
    validate_optional_len("image_url", payload.image_url.as_deref(), TEXT_MAX)?;

    let unchanged = existing.clone();
    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name.filter(|n| !n.is_empty()) {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    // An empty payload issues no write at all.
    let category = if active.is_changed() {
        active.update(&state.orm).await?
    } else {
        unchanged
    };

    tracing::info!(category_id = category.id, "category updated");

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let product_count = count_active_products(state, id).await?;
    Ok(ApiResponse::success(
        "Category updated",
        category_from_entity(category, product_count),
        Some(Meta::empty()),
    ))
}

pub async fn toggle_category_status(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let next = !existing.is_active;
    let mut active: CategoryActive = existing.into();
    active.is_active = Set(next);
    let category = active.update(&state.orm).await?;

    tracing::info!(
        category_id = category.id,
        is_active = category.is_active,
        "category status toggled"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_toggle",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id, "is_active": category.is_active })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let product_count = count_active_products(state, id).await?;
    Ok(ApiResponse::success(
        "Category status updated",
        category_from_entity(category, product_count),
        Some(Meta::empty()),
    ))
}

/// Hard delete: removes the category's reviews, then its products (active
/// or not), then the category, all in one transaction.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    if Categories::find_by_id(id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let product_ids: Vec<i32> = Products::find()
        .select_only()
        .column(ProductCol::Id)
        .filter(ProductCol::CategoryId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;

    if !product_ids.is_empty() {
        Reviews::delete_many()
            .filter(ReviewCol::ProductId.is_in(product_ids.clone()))
            .exec(&txn)
            .await?;

        Products::delete_many()
            .filter(ProductCol::CategoryId.eq(id))
            .exec(&txn)
            .await?;
    }

    Categories::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        category_id = id,
        products_removed = product_ids.len(),
        "category deleted"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id, "products_removed": product_ids.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category and its products deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Active-product counts per category, keyed by category id.
pub(crate) async fn active_product_counts(state: &AppState) -> AppResult<HashMap<i32, i64>> {
    let rows: Vec<(Option<i32>, i64)> = Products::find()
        .select_only()
        .column(ProductCol::CategoryId)
        .column_as(ProductCol::Id.count(), "count")
        .filter(ProductCol::IsActive.eq(true))
        .group_by(ProductCol::CategoryId)
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(category_id, count)| category_id.map(|id| (id, count)))
        .collect())
}

async fn count_active_products(state: &AppState, category_id: i32) -> AppResult<i64> {
    let count = Products::find()
        .filter(
            Condition::all()
                .add(ProductCol::CategoryId.eq(category_id))
                .add(ProductCol::IsActive.eq(true)),
        )
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

async fn find_by_name_ci(
    state: &AppState,
    name: &str,
    exclude_id: Option<i32>,
) -> AppResult<Option<CategoryModel>> {
    let mut finder = Categories::find().filter(
        Expr::expr(Func::lower(Expr::col(CategoryCol::Name))).eq(name.to_lowercase()),
    );
    if let Some(id) = exclude_id {
        finder = finder.filter(CategoryCol::Id.ne(id));
    }
    Ok(finder.one(&state.orm).await?)
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if name.chars().count() > NAME_MAX {
        return Err(AppError::Validation(format!(
            "name must be at most {NAME_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_optional_len(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn category_from_entity(model: CategoryModel, product_count: i64) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        image_url: model.image_url,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        product_count,
    }
}
