use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::extract::JsonBody;
use crate::domain::query::sale_query::{parse_date_range, SaleFilter, SaleListQuery, SaleSort};
use crate::domain::query::SortOrder;
use crate::domain::services::sale_service::SaleService;
use crate::domain::validation::{validate_id, validate_quantity};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::server::AppState;
use crate::utils::pagination::PageRequest;
use crate::utils::type_convert::{empty_as_none, lenient_string};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/{id}", get(get_sale))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: Option<String>,
}

impl CreateSaleRequest {
    pub fn parse(&self) -> Result<(u64, i32), AppError> {
        let (Some(product_id), Some(quantity)) = (&self.product_id, &self.quantity) else {
            return Err(AppError::Validation("productId and quantity are required".to_string()));
        };
        Ok((validate_id(product_id, "productId")?, validate_quantity(quantity)?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleListParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order_by: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub search: Option<String>,
}

impl SaleListParams {
    /// 非管理员只能查询自己的销售记录
    pub fn into_query(self, user: &AuthUser) -> Result<SaleListQuery, AppError> {
        let user_id = if user.is_admin() {
            self.user_id.as_deref().map(|raw| validate_id(raw, "userId")).transpose()?
        } else {
            Some(user.id)
        };
        let (start_date, end_date) = parse_date_range(self.start_date.as_deref(), self.end_date.as_deref())?;

        Ok(SaleListQuery {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref())?,
            sort: SaleSort::parse_or_default(self.order_by.as_deref())?,
            order: SortOrder::parse_or(self.order.as_deref(), SortOrder::Desc)?,
            filter: SaleFilter {
                user_id,
                product_id: self.product_id.as_deref().map(|raw| validate_id(raw, "productId")).transpose()?,
                category_id: self.category_id.as_deref().map(|raw| validate_id(raw, "categoryId")).transpose()?,
                start_date,
                end_date,
                search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            },
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleFilters<'a> {
    user_id: Option<u64>,
    product_id: Option<u64>,
    category_id: Option<u64>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    search: Option<&'a str>,
    order_by: SaleSort,
    order: SortOrder,
}

impl<'a> From<&'a SaleListQuery> for SaleFilters<'a> {
    fn from(query: &'a SaleListQuery) -> Self {
        Self {
            user_id: query.filter.user_id,
            product_id: query.filter.product_id,
            category_id: query.filter.category_id,
            start_date: query.filter.start_date,
            end_date: query.filter.end_date,
            search: query.filter.search.as_deref(),
            order_by: query.sort,
            order: query.order,
        }
    }
}

async fn create_sale(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateSaleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (product_id, quantity) = payload.parse()?;
    let receipt = SaleService::new(state).record_sale(user.id, product_id, quantity).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Sale recorded successfully",
            "sale": receipt.sale,
            "previousStock": receipt.previous_stock,
            "newStock": receipt.new_stock,
        })),
    ))
}

async fn list_sales(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<SaleListParams>,
) -> Result<Json<Value>, AppError> {
    let query = params.into_query(&user)?;
    let page = SaleService::new(state).list_sales(&query).await?;

    Ok(Json(json!({
        "sales": page.sales,
        "pagination": page.pagination,
        "filters": SaleFilters::from(&query),
    })))
}

async fn get_sale(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = validate_id(&id, "Sale id")?;
    let owner = (!user.is_admin()).then_some(user.id);
    let sale = SaleService::new(state).get_sale(id, owner).await?;

    Ok(Json(json!({ "sale": sale })))
}
