//! 列表查询构建器
//!
//! 过滤、排序、分页条件在这里组装成 sea-query 语句，再由服务层通过
//! `sea_query_binder` 交给 sqlx 执行。排序字段在 HTTP 层已经解析成枚举，
//! 构建器不会遇到未知字段。

pub mod product_query;
pub mod sale_query;

use sea_query::{Iden, Order};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::error::AppError;

#[derive(Iden)]
pub enum Products {
    Table,
    Id,
    Name,
    Price,
    Stock,
    Sku,
    Image,
    IsActive,
    CategoryId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Categories {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
pub enum Sales {
    Table,
    Id,
    ProductId,
    UserId,
    Quantity,
    UnitPrice,
    TotalPrice,
    CreatedAt,
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Name,
    Lastname,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse_or(raw: Option<&str>, default: SortOrder) -> Result<Self, AppError> {
        match raw {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Validation("order must be 'asc' or 'desc'".to_string())),
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// 组装 `%term%`，并转义 LIKE 通配符
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
