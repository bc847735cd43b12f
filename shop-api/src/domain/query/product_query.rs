use sea_query::{Alias, Cond, Expr, Func, Order, Query, SelectStatement};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use super::{contains_pattern, Categories, Products, SortOrder};
use crate::error::AppError;
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    Name,
    Price,
    Stock,
    /// 按关联分类名称排序，而不是 category_id
    Category,
}

impl ProductSort {
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, AppError> {
        match raw {
            None => Ok(ProductSort::Name),
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Validation(format!(
                    "Invalid orderBy '{}'. Allowed values: name, price, stock, category",
                    raw
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<u64>,
    pub search: Option<String>,
    /// 非管理员固定为 `Some(true)`
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ProductListQuery {
    pub page: PageRequest,
    pub sort: ProductSort,
    pub order: SortOrder,
    pub filter: ProductFilter,
}

impl ProductListQuery {
    pub fn select(&self) -> SelectStatement {
        let mut query = product_select();
        apply_filter(&mut query, &self.filter);

        let order: Order = self.order.into();
        match self.sort {
            ProductSort::Name => query.order_by((Products::Table, Products::Name), order),
            ProductSort::Price => query.order_by((Products::Table, Products::Price), order),
            ProductSort::Stock => query.order_by((Products::Table, Products::Stock), order),
            ProductSort::Category => query.order_by((Categories::Table, Categories::Name), order),
        };

        query
            .order_by((Products::Table, Products::Id), Order::Asc)
            .limit(self.page.limit)
            .offset(self.page.offset());

        query
    }

    pub fn count(&self) -> SelectStatement {
        let mut query = Query::select()
            .expr_as(Func::count(Expr::col((Products::Table, Products::Id))), Alias::new("total"))
            .from(Products::Table)
            .inner_join(
                Categories::Table,
                Expr::col((Products::Table, Products::CategoryId)).equals((Categories::Table, Categories::Id)),
            )
            .to_owned();
        apply_filter(&mut query, &self.filter);
        query
    }
}

/// 商品 + 分类名称，字段与 `ProductRecord` 一一对应
pub fn product_select() -> SelectStatement {
    Query::select()
        .columns([
            (Products::Table, Products::Id),
            (Products::Table, Products::Name),
            (Products::Table, Products::Price),
            (Products::Table, Products::Stock),
            (Products::Table, Products::Sku),
            (Products::Table, Products::Image),
            (Products::Table, Products::IsActive),
            (Products::Table, Products::CategoryId),
            (Products::Table, Products::CreatedAt),
            (Products::Table, Products::UpdatedAt),
        ])
        .expr_as(Expr::col((Categories::Table, Categories::Name)), Alias::new("category_name"))
        .from(Products::Table)
        .inner_join(
            Categories::Table,
            Expr::col((Products::Table, Products::CategoryId)).equals((Categories::Table, Categories::Id)),
        )
        .to_owned()
}

/// 按 id 查询单个商品
pub fn product_by_id(id: u64) -> SelectStatement {
    product_select()
        .and_where(Expr::col((Products::Table, Products::Id)).eq(id))
        .to_owned()
}

fn apply_filter(query: &mut SelectStatement, filter: &ProductFilter) {
    if let Some(category_id) = filter.category_id {
        query.and_where(Expr::col((Products::Table, Products::CategoryId)).eq(category_id));
    }

    if let Some(is_active) = filter.is_active {
        query.and_where(Expr::col((Products::Table, Products::IsActive)).eq(is_active));
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        query.cond_where(
            Cond::any()
                .add(Expr::expr(Func::lower(Expr::col((Products::Table, Products::Name)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((Products::Table, Products::Sku)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((Categories::Table, Categories::Name)))).like(pattern.as_str())),
        );
    }
}
