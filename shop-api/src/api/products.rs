use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::extract::ProductForm;
use crate::domain::query::product_query::{ProductFilter, ProductListQuery, ProductSort};
use crate::domain::query::SortOrder;
use crate::domain::services::product_service::ProductService;
use crate::domain::validation::{validate_category_id, validate_id, validate_is_active};
use crate::error::AppError;
use crate::middleware::auth::{AdminUser, AuthUser};
use crate::server::AppState;
use crate::utils::pagination::PageRequest;
use crate::utils::type_convert::empty_as_none;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/{id}", get(get_product).put(update_product).delete(delete_product))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order_by: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub is_active: Option<String>,
}

impl ProductListParams {
    /// 非管理员只能看到上架商品，`isActive` 参数对其无效
    pub fn into_query(self, user: &AuthUser) -> Result<ProductListQuery, AppError> {
        let is_active = if user.is_admin() {
            self.is_active.as_deref().map(validate_is_active).transpose()?
        } else {
            Some(true)
        };

        Ok(ProductListQuery {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref())?,
            sort: ProductSort::parse_or_default(self.order_by.as_deref())?,
            order: SortOrder::parse_or(self.order.as_deref(), SortOrder::Asc)?,
            filter: ProductFilter {
                category_id: self.category_id.as_deref().map(validate_category_id).transpose()?,
                search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                is_active,
            },
        })
    }
}

/// 回显实际生效的筛选条件
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductFilters<'a> {
    category_id: Option<u64>,
    search: Option<&'a str>,
    order_by: ProductSort,
    order: SortOrder,
    is_active: Option<bool>,
}

impl<'a> From<&'a ProductListQuery> for ProductFilters<'a> {
    fn from(query: &'a ProductListQuery) -> Self {
        Self {
            category_id: query.filter.category_id,
            search: query.filter.search.as_deref(),
            order_by: query.sort,
            order: query.order,
            is_active: query.filter.is_active,
        }
    }
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ProductListParams>,
) -> Result<Json<Value>, AppError> {
    let query = params.into_query(&user)?;
    let page = ProductService::new(state).list_products(&query).await?;

    Ok(Json(json!({
        "products": page.products,
        "pagination": page.pagination,
        "filters": ProductFilters::from(&query),
    })))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = validate_id(&id, "Product id")?;
    let product = ProductService::new(state).get_product(id, user.is_admin()).await?;

    Ok(Json(json!({ "product": product })))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    form: ProductForm,
) -> Result<(StatusCode, Json<Value>), AppError> {
    tracing::debug!(admin_id = admin.id, has_image = form.image.is_some(), "Creating product");

    let product = ProductService::new(state).create_product(form.fields, form.image).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    form: ProductForm,
) -> Result<Json<Value>, AppError> {
    // 先解析 id，失败时上传的图片随 form 一起被清理
    let id = validate_id(&id, "Product id")?;
    tracing::debug!(admin_id = admin.id, product_id = id, "Updating product");

    let product = ProductService::new(state).update_product(id, form.fields, form.image).await?;

    Ok(Json(json!({
        "message": "Product updated successfully",
        "product": product,
    })))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = validate_id(&id, "Product id")?;
    tracing::debug!(admin_id = admin.id, product_id = id, "Deactivating product");

    let product = ProductService::new(state).deactivate_product(id).await?;

    Ok(Json(json!({
        "message": "Product deactivated successfully",
        "product": product,
    })))
}
