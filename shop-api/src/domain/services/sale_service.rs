use std::sync::Arc;

use sea_query::MysqlQueryBuilder;
use sea_query_binder::SqlxBinder;
use serde::Serialize;

use crate::domain::models::sale::{SaleRecord, SaleView};
use crate::domain::query::sale_query::{sale_by_id, SaleListQuery};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::Pagination;

/// 一次销售的结果，附带扣减前后的库存
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: SaleView,
    pub previous_stock: i32,
    pub new_stock: i32,
}

#[derive(Debug, Serialize)]
pub struct SalePage {
    pub sales: Vec<SaleView>,
    pub pagination: Pagination,
}

/// 库存不足时拒绝，返回扣减后的库存
pub fn check_stock(stock: i32, quantity: i32) -> Result<i32, AppError> {
    if quantity > stock {
        return Err(insufficient_stock(stock));
    }
    Ok(stock - quantity)
}

pub fn total_price(unit_price: i64, quantity: i32) -> Result<i64, AppError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::Validation("Sale total exceeds the supported range".to_string()))
}

fn insufficient_stock(available: i32) -> AppError {
    AppError::Validation(format!("Insufficient stock. Available: {}", available))
}

pub struct SaleService {
    state: Arc<AppState>,
}

impl SaleService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// 扣库存与写销售记录在同一事务中完成
    pub async fn record_sale(&self, seller_id: u64, product_id: u64, quantity: i32) -> Result<SaleReceipt, AppError> {
        let mut tx = self.state.db.begin().await?;

        // 锁定商品行，串行化同一商品的并发销售
        let product: Option<(i64, i32, bool)> =
            sqlx::query_as("SELECT price, stock, is_active FROM products WHERE id = ? FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((unit_price, stock, _)) = product.filter(|(_, _, is_active)| *is_active) else {
            return Err(AppError::NotFound(format!("Product with ID {} not found", product_id)));
        };

        let new_stock = check_stock(stock, quantity)?;
        let total = total_price(unit_price, quantity)?;

        let updated = sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
            .bind(quantity)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() != 1 {
            return Err(insufficient_stock(stock));
        }

        let sale_id = sqlx::query(
            r#"
            INSERT INTO sales (product_id, user_id, quantity, unit_price, total_price)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(product_id)
        .bind(seller_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(total)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        let (sql, values) = sale_by_id(sale_id).build_sqlx(MysqlQueryBuilder);
        let record = sqlx::query_as_with::<_, SaleRecord, _>(&sql, values)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            sale_id,
            product_id,
            seller_id,
            quantity,
            previous_stock = stock,
            new_stock,
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale: record.into(),
            previous_stock: stock,
            new_stock,
        })
    }

    pub async fn list_sales(&self, query: &SaleListQuery) -> Result<SalePage, AppError> {
        let (sql, values) = query.count().build_sqlx(MysqlQueryBuilder);
        let total: i64 = sqlx::query_scalar_with(&sql, values).fetch_one(&self.state.db).await?;

        let (sql, values) = query.select().build_sqlx(MysqlQueryBuilder);
        let records = sqlx::query_as_with::<_, SaleRecord, _>(&sql, values)
            .fetch_all(&self.state.db)
            .await?;

        Ok(SalePage {
            sales: records.into_iter().map(SaleView::from).collect(),
            pagination: Pagination::new(query.page, total.max(0) as u64),
        })
    }

    /// `owner` 为 `Some` 时只能查看自己的销售记录，其他人的记录按不存在处理
    pub async fn get_sale(&self, id: u64, owner: Option<u64>) -> Result<SaleView, AppError> {
        let (sql, values) = sale_by_id(id).build_sqlx(MysqlQueryBuilder);
        let record = sqlx::query_as_with::<_, SaleRecord, _>(&sql, values)
            .fetch_optional(&self.state.db)
            .await?
            .filter(|record| owner.is_none_or(|user_id| record.user_id == user_id))
            .ok_or_else(|| AppError::NotFound(format!("Sale with ID {} not found", id)))?;

        Ok(record.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selling_within_stock_leaves_remainder() {
        assert_eq!(check_stock(10, 3).unwrap(), 7);
        assert_eq!(check_stock(3, 3).unwrap(), 0);
    }

    #[test]
    fn overselling_names_available_stock() {
        let err = check_stock(2, 5).unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Insufficient stock. Available: 2");
    }

    #[test]
    fn total_is_unit_price_times_quantity() {
        assert_eq!(total_price(1250, 4).unwrap(), 5000);
        assert!(total_price(i64::MAX, 2).is_err());
    }
}
