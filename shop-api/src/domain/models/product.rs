use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::domain::models::category::Category;

/// products 与 categories 联表后的一行
#[derive(Debug, Clone, FromRow)]
pub struct ProductRecord {
    pub id: u64,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub sku: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub category_id: u64,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: u64,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub sku: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn from_record(record: ProductRecord, public_url: &str) -> Self {
        Self {
            image: image_url(public_url, record.image.as_deref()),
            id: record.id,
            name: record.name,
            price: record.price,
            stock: record.stock,
            sku: record.sku,
            is_active: record.is_active,
            category: Category {
                id: record.category_id,
                name: record.category_name,
            },
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// 数据库只存文件名，返回时拼成完整地址
pub fn image_url(public_url: &str, filename: Option<&str>) -> Option<String> {
    filename
        .filter(|name| !name.is_empty())
        .map(|name| format!("{}/uploads/products/{}", public_url.trim_end_matches('/'), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_is_fully_qualified() {
        assert_eq!(
            image_url("http://localhost:4000/", Some("a1b2.png")).as_deref(),
            Some("http://localhost:4000/uploads/products/a1b2.png")
        );
    }

    #[test]
    fn missing_image_maps_to_null() {
        assert_eq!(image_url("http://localhost:4000", None), None);
        assert_eq!(image_url("http://localhost:4000", Some("")), None);
    }
}
