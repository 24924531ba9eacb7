use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};

use crate::{
    dto::categories::CategoryList,
    dto::products::{
        BrandList, CreateProductRequest, ProductList, UpdateProductRequest, UpdateStockRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::{FeaturedQuery, ProductFilter},
    services::product_service,
    state::AppState,
};

const FEATURED_DEFAULT: u64 = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/filter", get(list_filtered))
        .route("/featured", get(list_featured))
        .route("/categories", get(list_category_summaries))
        .route("/brands", get(list_brands))
        .route("/category/{name}", get(list_by_category_name))
        .route("/category/id/{category_id}", get(list_by_category_id))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/stock", patch(update_stock))
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List active products, newest first", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/filter",
    params(
        ("search" = Option<String>, Query, description = "Match against name, description and tags"),
        ("category" = Option<String>, Query, description = "Category name; ignored when category_id is set"),
        ("category_id" = Option<i32>, Query, description = "Category ID, takes precedence over category"),
        ("brand" = Option<String>, Query, description = "Exact brand match"),
        ("min_price" = Option<String>, Query, description = "Lower price bound"),
        ("max_price" = Option<String>, Query, description = "Upper price bound"),
        ("is_featured" = Option<bool>, Query, description = "Featured flag"),
        ("on_discount" = Option<bool>, Query, description = "Only discounted products"),
        ("in_stock" = Option<bool>, Query, description = "Only products with stock > 0"),
        ("sort_by" = Option<String>, Query, description = "price_asc, price_desc, rating or newest (default)"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("page_size" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Filtered product listing", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_filtered(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_filtered(&state, filter).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/featured",
    params(
        ("count" = Option<u64>, Query, description = "Number of products, default 8"),
    ),
    responses(
        (status = 200, description = "Newest featured products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_featured(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let count = query.count.unwrap_or(FEATURED_DEFAULT);
    let resp = product_service::list_featured(&state, count).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/categories",
    responses(
        (status = 200, description = "Active categories with product counts", body = ApiResponse<CategoryList>)
    ),
    tag = "Products"
)]
pub async fn list_category_summaries(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = product_service::list_category_summaries(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/brands",
    responses(
        (status = 200, description = "Distinct brands of active products", body = ApiResponse<BrandList>)
    ),
    tag = "Products"
)]
pub async fn list_brands(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = product_service::list_brands(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/category/{name}",
    params(
        ("name" = String, Path, description = "Category name as cached on the product")
    ),
    responses(
        (status = 200, description = "Active products carrying the category name", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_by_category_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_by_category_name(&state, &name).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/category/id/{category_id}",
    params(
        ("category_id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Active products linked to the category", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_by_category_id(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_by_category_id(&state, category_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found or inactive"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Category not found"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update product", body = ApiResponse<Product>),
        (status = 404, description = "Product or category not found"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/stock",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Overwrite the stock count", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStockRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Soft-delete product", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not found"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}
