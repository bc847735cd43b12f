use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::domain::models::category::Category;

/// sales 联表 products / categories / users
#[derive(Debug, Clone, FromRow)]
pub struct SaleRecord {
    pub id: u64,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub product_id: u64,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub category_id: u64,
    pub category_name: String,
    pub user_id: u64,
    pub user_name: String,
    pub user_lastname: String,
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleProduct {
    pub id: u64,
    pub name: String,
    pub sku: Option<String>,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSeller {
    pub id: u64,
    pub name: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    pub id: u64,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub product: SaleProduct,
    pub user: SaleSeller,
}

impl From<SaleRecord> for SaleView {
    fn from(record: SaleRecord) -> Self {
        Self {
            id: record.id,
            quantity: record.quantity,
            unit_price: record.unit_price,
            total_price: record.total_price,
            created_at: record.created_at,
            product: SaleProduct {
                id: record.product_id,
                name: record.product_name,
                sku: record.product_sku,
                category: Category {
                    id: record.category_id,
                    name: record.category_name,
                },
            },
            user: SaleSeller {
                id: record.user_id,
                name: record.user_name,
                lastname: record.user_lastname,
                email: record.user_email,
            },
        }
    }
}
