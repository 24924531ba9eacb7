use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        products::{
            BrandList, CreateProductRequest, ProductList, UpdateProductRequest,
            UpdateStockRequest,
        },
        reviews::{CreateReviewRequest, ReviewList},
    },
    models::{Category, Product, Review},
    response::{ApiResponse, Meta},
    routes::{categories, health, params, products, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::toggle_category_status,
        categories::delete_category,
        products::list_products,
        products::list_filtered,
        products::list_featured,
        products::list_category_summaries,
        products::list_brands,
        products::list_by_category_name,
        products::list_by_category_id,
        products::get_product,
        products::create_product,
        products::update_product,
        products::update_stock,
        products::delete_product,
        reviews::list_reviews,
        reviews::add_review
    ),
    components(
        schemas(
            Category,
            Product,
            Review,
            CategoryList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            ProductList,
            BrandList,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateStockRequest,
            ReviewList,
            CreateReviewRequest,
            params::ProductFilter,
            params::ProductSortBy,
            params::FeaturedQuery,
            Meta,
            ApiResponse<Category>,
            ApiResponse<CategoryList>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<BrandList>,
            ApiResponse<Review>,
            ApiResponse<ReviewList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Reviews", description = "Review endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
