use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Alias, Cond, Expr, Func, Order, Query, SelectStatement};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use super::{contains_pattern, Categories, Products, Sales, SortOrder, Users};
use crate::error::AppError;
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum SaleSort {
    CreatedAt,
    Quantity,
    UnitPrice,
    TotalPrice,
}

impl SaleSort {
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, AppError> {
        match raw {
            None => Ok(SaleSort::CreatedAt),
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Validation(format!(
                    "Invalid orderBy '{}'. Allowed values: createdAt, quantity, unitPrice, totalPrice",
                    raw
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// `startDate` / `endDate` 均为闭区间；只给日期时结束时间取当天 23:59:59
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let start = start.map(|raw| parse_date_bound(raw, Bound::Start)).transpose()?;
    let end = end.map(|raw| parse_date_bound(raw, Bound::End)).transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::Validation("startDate must not be after endDate".to_string()));
        }
    }

    Ok((start, end))
}

fn parse_date_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}'. Expected YYYY-MM-DD", raw)))?;

    let time = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_opt(23, 59, 59),
    };

    time.map(|t| t.and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid date '{}'", raw)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleFilter {
    pub user_id: Option<u64>,
    pub product_id: Option<u64>,
    pub category_id: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaleListQuery {
    pub page: PageRequest,
    pub sort: SaleSort,
    pub order: SortOrder,
    pub filter: SaleFilter,
}

impl SaleListQuery {
    pub fn select(&self) -> SelectStatement {
        let mut query = sale_select();
        apply_filter(&mut query, &self.filter);

        let order: Order = self.order.into();
        let column = match self.sort {
            SaleSort::CreatedAt => Sales::CreatedAt,
            SaleSort::Quantity => Sales::Quantity,
            SaleSort::UnitPrice => Sales::UnitPrice,
            SaleSort::TotalPrice => Sales::TotalPrice,
        };

        query
            .order_by((Sales::Table, column), order.clone())
            .order_by((Sales::Table, Sales::Id), order)
            .limit(self.page.limit)
            .offset(self.page.offset());

        query
    }

    pub fn count(&self) -> SelectStatement {
        let mut query = Query::select()
            .expr_as(Func::count(Expr::col((Sales::Table, Sales::Id))), Alias::new("total"))
            .from(Sales::Table)
            .to_owned();
        join_relations(&mut query);
        apply_filter(&mut query, &self.filter);
        query
    }
}

/// 销售记录 + 商品 / 分类 / 销售员，字段与 `SaleRecord` 一一对应
pub fn sale_select() -> SelectStatement {
    let mut query = Query::select()
        .columns([
            (Sales::Table, Sales::Id),
            (Sales::Table, Sales::Quantity),
            (Sales::Table, Sales::UnitPrice),
            (Sales::Table, Sales::TotalPrice),
            (Sales::Table, Sales::CreatedAt),
            (Sales::Table, Sales::ProductId),
            (Sales::Table, Sales::UserId),
        ])
        .expr_as(Expr::col((Products::Table, Products::Name)), Alias::new("product_name"))
        .expr_as(Expr::col((Products::Table, Products::Sku)), Alias::new("product_sku"))
        .expr_as(Expr::col((Products::Table, Products::CategoryId)), Alias::new("category_id"))
        .expr_as(Expr::col((Categories::Table, Categories::Name)), Alias::new("category_name"))
        .expr_as(Expr::col((Users::Table, Users::Name)), Alias::new("user_name"))
        .expr_as(Expr::col((Users::Table, Users::Lastname)), Alias::new("user_lastname"))
        .expr_as(Expr::col((Users::Table, Users::Email)), Alias::new("user_email"))
        .from(Sales::Table)
        .to_owned();
    join_relations(&mut query);
    query
}

pub fn sale_by_id(id: u64) -> SelectStatement {
    sale_select()
        .and_where(Expr::col((Sales::Table, Sales::Id)).eq(id))
        .to_owned()
}

fn join_relations(query: &mut SelectStatement) {
    query
        .inner_join(
            Products::Table,
            Expr::col((Sales::Table, Sales::ProductId)).equals((Products::Table, Products::Id)),
        )
        .inner_join(
            Categories::Table,
            Expr::col((Products::Table, Products::CategoryId)).equals((Categories::Table, Categories::Id)),
        )
        .inner_join(
            Users::Table,
            Expr::col((Sales::Table, Sales::UserId)).equals((Users::Table, Users::Id)),
        );
}

fn apply_filter(query: &mut SelectStatement, filter: &SaleFilter) {
    if let Some(user_id) = filter.user_id {
        query.and_where(Expr::col((Sales::Table, Sales::UserId)).eq(user_id));
    }

    if let Some(product_id) = filter.product_id {
        query.and_where(Expr::col((Sales::Table, Sales::ProductId)).eq(product_id));
    }

    if let Some(category_id) = filter.category_id {
        query.and_where(Expr::col((Products::Table, Products::CategoryId)).eq(category_id));
    }

    if let Some(start) = filter.start_date {
        query.and_where(Expr::col((Sales::Table, Sales::CreatedAt)).gte(start));
    }

    if let Some(end) = filter.end_date {
        query.and_where(Expr::col((Sales::Table, Sales::CreatedAt)).lte(end));
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        query.cond_where(
            Cond::any()
                .add(Expr::expr(Func::lower(Expr::col((Products::Table, Products::Name)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((Products::Table, Products::Sku)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((Users::Table, Users::Name)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((Users::Table, Users::Lastname)))).like(pattern.as_str())),
        );
    }
}
