use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    audit::log_audit,
    dto::categories::CategoryList,
    dto::products::{
        BrandList, CreateProductRequest, ProductList, UpdateProductRequest, UpdateStockRequest,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories, Model as CategoryModel},
        products::{
            ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
            Model as ProductModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductFilter, ProductSortBy},
    services::category_service,
    state::AppState,
};

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .filter(ProductCol::IsActive.eq(true))
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;
    let (product, category) = match result {
        Some(pair) => pair,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product, category.as_ref()),
        None,
    ))
}

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let rows = Products::find()
        .filter(ProductCol::IsActive.eq(true))
        .order_by_desc(ProductCol::CreatedAt)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category.as_ref()))
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_featured(state: &AppState, count: u64) -> AppResult<ApiResponse<ProductList>> {
    let rows = Products::find()
        .filter(
            Condition::all()
                .add(ProductCol::IsActive.eq(true))
                .add(ProductCol::IsFeatured.eq(true)),
        )
        .order_by_desc(ProductCol::CreatedAt)
        .find_also_related(Categories)
        .limit(count)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category.as_ref()))
        .collect();

    Ok(ApiResponse::success(
        "Featured products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_by_category_name(
    state: &AppState,
    name: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let rows = Products::find()
        .filter(
            Condition::all()
                .add(ProductCol::IsActive.eq(true))
                .add(ProductCol::CategoryName.eq(name)),
        )
        .order_by_desc(ProductCol::CreatedAt)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category.as_ref()))
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_by_category_id(
    state: &AppState,
    category_id: i32,
) -> AppResult<ApiResponse<ProductList>> {
    let rows = Products::find()
        .filter(
            Condition::all()
                .add(ProductCol::IsActive.eq(true))
                .add(ProductCol::CategoryId.eq(category_id)),
        )
        .order_by_desc(ProductCol::CreatedAt)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category.as_ref()))
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

/// Filtered, sorted, paginated listing over active products.
pub async fn list_filtered(
    state: &AppState,
    filter: ProductFilter,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, page_size, offset) = filter.paging();

    let mut condition = Condition::all().add(ProductCol::IsActive.eq(true));

    if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProductCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Description).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Tags).ilike(pattern)),
        );
    }

    // Id wins over name when both are supplied.
    if let Some(category_id) = filter.category_id {
        condition = condition.add(ProductCol::CategoryId.eq(category_id));
    } else if let Some(category) = filter.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(ProductCol::CategoryName.eq(category.clone()));
    }

    if let Some(brand) = filter.brand.as_ref().filter(|b| !b.is_empty()) {
        condition = condition.add(ProductCol::Brand.eq(brand.clone()));
    }
    if let Some(min_price) = filter.min_price {
        condition = condition.add(ProductCol::Price.gte(min_price));
    }
    if let Some(max_price) = filter.max_price {
        condition = condition.add(ProductCol::Price.lte(max_price));
    }
    if let Some(is_featured) = filter.is_featured {
        condition = condition.add(ProductCol::IsFeatured.eq(is_featured));
    }
    if filter.on_discount == Some(true) {
        condition = condition.add(ProductCol::DiscountPrice.is_not_null());
    }
    if filter.in_stock == Some(true) {
        condition = condition.add(ProductCol::Stock.gt(0));
    }

    let finder = Products::find().filter(condition);
    let finder = match filter.sort_by.unwrap_or(ProductSortBy::Newest) {
        ProductSortBy::PriceAsc => finder.order_by_asc(ProductCol::Price),
        ProductSortBy::PriceDesc => finder.order_by_desc(ProductCol::Price),
        ProductSortBy::Rating => finder.order_by_desc(ProductCol::Rating),
        ProductSortBy::Newest => finder.order_by_desc(ProductCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .find_also_related(Categories)
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category.as_ref()))
        .collect();

    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if payload.price <= Decimal::ZERO {
        return Err(AppError::Validation("price must be greater than 0".into()));
    }

    // When a category id is given, its name is copied onto the product.
    let category = match payload.category_id {
        Some(category_id) => {
            let category = Categories::find_by_id(category_id).one(&state.orm).await?;
            match category {
                Some(c) => Some(c),
                None => return Err(AppError::NotFound),
            }
        }
        None => None,
    };

    let category_name = category
        .as_ref()
        .map(|c| c.name.clone())
        .or(payload.category_name)
        .unwrap_or_else(|| "General".to_string());

    let now = Utc::now();
    let product = ProductActive {
        id: NotSet,
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        discount_price: Set(payload.discount_price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        category_name: Set(category_name),
        brand: Set(payload.brand.unwrap_or_else(|| "Generic".to_string())),
        color: Set(payload.color),
        size: Set(payload.size),
        material: Set(payload.material),
        image_url: Set(payload.image_url),
        rating: Set(0.0),
        review_count: Set(0),
        is_active: Set(true),
        is_featured: Set(payload.is_featured),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        sku: Set(payload.sku),
        tags: Set(payload.tags),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = product.id, name = %product.name, "product created");

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, category.as_ref()),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(AppError::Validation("price must be greater than 0".into()));
        }
    }

    // Resolve the category reference first. A changed id re-syncs the cached
    // name; a name on its own rewrites the cached name without touching the
    // id link.
    let mut category: Option<CategoryModel> = None;
    let mut category_fields: Option<(Option<i32>, String)> = None;
    if let Some(category_id) = payload.category_id {
        if Some(category_id) != existing.category_id {
            let found = Categories::find_by_id(category_id).one(&state.orm).await?;
            let found = match found {
                Some(c) => c,
                None => return Err(AppError::NotFound),
            };
            category_fields = Some((Some(category_id), found.name.clone()));
            category = Some(found);
        }
    } else if let Some(name) = payload.category_name.as_ref().filter(|n| !n.is_empty()) {
        if *name != existing.category_name {
            category_fields = Some((existing.category_id, name.clone()));
        }
    }

    let mut active: ProductActive = existing.into();
    if let Some((category_id, category_name)) = category_fields {
        active.category_id = Set(category_id);
        active.category_name = Set(category_name);
    }
    if let Some(name) = payload.name.filter(|n| !n.is_empty()) {
        active.name = Set(name);
    }
    if let Some(description) = payload.description.filter(|d| !d.is_empty()) {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(brand) = payload.brand.filter(|b| !b.is_empty()) {
        active.brand = Set(brand);
    }
    if let Some(is_active_flag) = payload.is_active {
        active.is_active = Set(is_active_flag);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    // Explicit-clear fields: the supplied value is written back as-is,
    // absent included.
    active.discount_price = Set(payload.discount_price);
    active.color = Set(payload.color);
    active.size = Set(payload.size);
    active.material = Set(payload.material);
    active.image_url = Set(payload.image_url);
    active.sku = Set(payload.sku);
    active.tags = Set(payload.tags);
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = product.id, "product updated");

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let category = match category {
        Some(c) => Some(c),
        None => load_category(state, product.category_id).await?,
    };

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product, category.as_ref()),
        Some(Meta::empty()),
    ))
}

/// Soft delete: the row is kept, listings skip it. Reviews stay in place.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ProductActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = product.id, "product soft-deleted");

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Overwrites the stock count; this is not an increment.
pub async fn update_stock(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateStockRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.quantity < 0 {
        return Err(AppError::Validation("stock cannot be negative".into()));
    }

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ProductActive = existing.into();
    active.stock = Set(payload.quantity);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_stock_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "stock": product.stock })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let category = load_category(state, product.category_id).await?;
    Ok(ApiResponse::success(
        "Stock updated",
        product_from_entity(product, category.as_ref()),
        Some(Meta::empty()),
    ))
}

/// Active categories with their active-product counts, ordered by name.
pub async fn list_category_summaries(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let categories = Categories::find()
        .filter(CategoryCol::IsActive.eq(true))
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?;

    let counts = category_service::active_product_counts(state).await?;
    let items = categories
        .into_iter()
        .map(|category| {
            let product_count = counts.get(&category.id).copied().unwrap_or(0);
            category_service::category_from_entity(category, product_count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

/// Distinct brands across active products, sorted.
pub async fn list_brands(state: &AppState) -> AppResult<ApiResponse<BrandList>> {
    let items: Vec<String> = Products::find()
        .select_only()
        .column(ProductCol::Brand)
        .filter(ProductCol::IsActive.eq(true))
        .distinct()
        .order_by_asc(ProductCol::Brand)
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Brands",
        BrandList { items },
        Some(Meta::empty()),
    ))
}

async fn load_category(
    state: &AppState,
    category_id: Option<i32>,
) -> AppResult<Option<CategoryModel>> {
    match category_id {
        Some(id) => Ok(Categories::find_by_id(id).one(&state.orm).await?),
        None => Ok(None),
    }
}

fn product_from_entity(model: ProductModel, category: Option<&CategoryModel>) -> Product {
    let final_price = model.final_price();
    let discount_percentage = model.discount_percentage();
    let has_discount = model.has_discount();
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        discount_price: model.discount_price,
        stock: model.stock,
        category_id: model.category_id,
        category_name: model.category_name,
        category_image_url: category.and_then(|c| c.image_url.clone()),
        brand: model.brand,
        color: model.color,
        size: model.size,
        material: model.material,
        image_url: model.image_url,
        rating: model.rating,
        review_count: model.review_count,
        is_active: model.is_active,
        is_featured: model.is_featured,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        sku: model.sku,
        tags: model.tags,
        final_price,
        discount_percentage,
        has_discount,
    }
}
