//! 商品创建、部分更新与下架
//!
//! 所有写操作在一个事务内完成：SKU 唯一性检查、分类查找或创建、商品写入。
//! 上传的图片以 `StoredUpload` 传入，只有事务提交后才会保留，否则随守卫一起删除。

use std::sync::Arc;

use sea_query::{Expr, MysqlQueryBuilder, Query, UpdateStatement};
use sea_query_binder::SqlxBinder;
use serde::Serialize;
use sqlx::{MySql, MySqlConnection};

use crate::domain::models::product::{ProductRecord, ProductView};
use crate::domain::query::product_query::{product_by_id, ProductListQuery};
use crate::domain::query::Products;
use crate::domain::services::category_service::{self, CategoryInput};
use crate::domain::validation::{
    validate_is_active, validate_name, validate_price, validate_sku, validate_stock, ProductFields,
};
use crate::error::AppError;
use crate::infrastructure::storage::StoredUpload;
use crate::server::AppState;
use crate::utils::pagination::Pagination;

/// 创建商品所需的完整字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub sku: Option<String>,
    pub is_active: bool,
    pub category: CategoryInput,
}

impl NewProduct {
    pub fn from_fields(fields: &ProductFields) -> Result<Self, AppError> {
        let (Some(name), Some(price), Some(stock)) = (&fields.name, &fields.price, &fields.stock) else {
            return Err(AppError::Validation("Name, price and stock are required".to_string()));
        };

        let category = CategoryInput::from_fields(fields.category_id.as_deref(), fields.category_name.as_deref())?
            .ok_or_else(|| AppError::Validation("Either categoryId or categoryName is required".to_string()))?;

        Ok(Self {
            name: validate_name(name)?,
            price: validate_price(price)?,
            stock: validate_stock(stock)?,
            sku: fields.sku.as_deref().map(validate_sku).transpose()?,
            is_active: fields.is_active.as_deref().map(validate_is_active).transpose()?.unwrap_or(true),
            category,
        })
    }
}

/// 部分更新：只有调用方显式提供的字段才会出现在这里
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
    pub category: Option<CategoryInput>,
}

impl ProductChanges {
    pub fn from_fields(fields: &ProductFields, has_image: bool) -> Result<Self, AppError> {
        if !fields.has_any_field() && !has_image {
            return Err(AppError::Validation("At least one field must be provided to update".to_string()));
        }

        Ok(Self {
            name: fields.name.as_deref().map(validate_name).transpose()?,
            price: fields.price.as_deref().map(validate_price).transpose()?,
            stock: fields.stock.as_deref().map(validate_stock).transpose()?,
            sku: fields.sku.as_deref().map(validate_sku).transpose()?,
            is_active: fields.is_active.as_deref().map(validate_is_active).transpose()?,
            category: CategoryInput::from_fields(fields.category_id.as_deref(), fields.category_name.as_deref())?,
        })
    }
}

/// 解析完分类和图片之后的稀疏更新
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub changes: ProductChanges,
    pub category_id: Option<u64>,
    pub image: Option<String>,
}

impl ProductPatch {
    /// 没有任何可写字段时返回 `None`
    pub fn update_statement(&self, id: u64) -> Option<UpdateStatement> {
        let mut stmt = Query::update();
        stmt.table(Products::Table);

        let mut touched = false;
        if let Some(name) = &self.changes.name {
            stmt.value(Products::Name, name.as_str());
            touched = true;
        }
        if let Some(price) = self.changes.price {
            stmt.value(Products::Price, price);
            touched = true;
        }
        if let Some(stock) = self.changes.stock {
            stmt.value(Products::Stock, stock);
            touched = true;
        }
        if let Some(sku) = &self.changes.sku {
            stmt.value(Products::Sku, sku.as_str());
            touched = true;
        }
        if let Some(is_active) = self.changes.is_active {
            stmt.value(Products::IsActive, is_active);
            touched = true;
        }
        if let Some(category_id) = self.category_id {
            stmt.value(Products::CategoryId, category_id);
            touched = true;
        }
        if let Some(image) = &self.image {
            stmt.value(Products::Image, image.as_str());
            touched = true;
        }

        if !touched {
            return None;
        }

        stmt.and_where(Expr::col(Products::Id).eq(id));
        Some(stmt)
    }
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

pub struct ProductService {
    state: Arc<AppState>,
}

impl ProductService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list_products(&self, query: &ProductListQuery) -> Result<ProductPage, AppError> {
        // 获取总记录数
        let (sql, values) = query.count().build_sqlx(MysqlQueryBuilder);
        let total: i64 = sqlx::query_scalar_with(&sql, values).fetch_one(&self.state.db).await?;

        // 获取分页数据
        let (sql, values) = query.select().build_sqlx(MysqlQueryBuilder);
        let records = sqlx::query_as_with::<_, ProductRecord, _>(&sql, values)
            .fetch_all(&self.state.db)
            .await?;

        let public_url = &self.state.config.server.public_url;
        Ok(ProductPage {
            products: records
                .into_iter()
                .map(|record| ProductView::from_record(record, public_url))
                .collect(),
            pagination: Pagination::new(query.page, total.max(0) as u64),
        })
    }

    /// 非管理员看不到已下架商品，按不存在处理
    pub async fn get_product(&self, id: u64, include_inactive: bool) -> Result<ProductView, AppError> {
        let record = fetch_record(&self.state.db, id)
            .await?
            .filter(|record| include_inactive || record.is_active)
            .ok_or_else(|| product_not_found(id))?;

        Ok(ProductView::from_record(record, &self.state.config.server.public_url))
    }

    pub async fn create_product(
        &self,
        fields: ProductFields,
        upload: Option<StoredUpload>,
    ) -> Result<ProductView, AppError> {
        let product = NewProduct::from_fields(&fields)?;

        let mut tx = self.state.db.begin().await?;

        if let Some(sku) = &product.sku {
            ensure_sku_available(&mut tx, sku, None).await?;
        }

        let resolved = category_service::resolve(&mut tx, &product.category).await?;
        let category = resolved.persist(&mut tx).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (name, price, stock, sku, image, is_active, category_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.sku)
        .bind(upload.as_ref().map(StoredUpload::filename))
        .bind(product.is_active)
        .bind(category.id)
        .execute(&mut *tx)
        .await
        .map_err(sku_conflict)?;

        let id = result.last_insert_id();
        tx.commit().await?;

        // 提交成功后才保留图片
        if let Some(upload) = upload {
            upload.keep();
        }

        tracing::info!(product_id = id, name = %product.name, category = %category.name, "Product created");

        self.get_product(id, true).await
    }

    pub async fn update_product(
        &self,
        id: u64,
        fields: ProductFields,
        upload: Option<StoredUpload>,
    ) -> Result<ProductView, AppError> {
        let mut tx = self.state.db.begin().await?;

        let current = fetch_record(&mut *tx, id).await?.ok_or_else(|| product_not_found(id))?;
        let changes = ProductChanges::from_fields(&fields, upload.is_some())?;

        // SKU 未变化时不做唯一性检查
        if let Some(sku) = &changes.sku {
            if current.sku.as_deref() != Some(sku.as_str()) {
                ensure_sku_available(&mut tx, sku, Some(id)).await?;
            }
        }

        let category_id = match &changes.category {
            Some(input) => {
                let resolved = category_service::resolve(&mut tx, input).await?;
                Some(resolved.persist(&mut tx).await?.id)
            }
            None => None,
        };

        let patch = ProductPatch {
            changes,
            category_id,
            image: upload.as_ref().map(|u| u.filename().to_string()),
        };
        let stmt = patch
            .update_statement(id)
            .ok_or_else(|| AppError::Validation("Nothing to update".to_string()))?;

        let (sql, values) = stmt.build_sqlx(MysqlQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&mut *tx)
            .await
            .map_err(sku_conflict)?;

        tx.commit().await?;

        // 新图片落库后删除旧图片
        if let Some(upload) = upload {
            upload.keep();
            if let Some(old) = current.image.as_deref() {
                self.state.images.remove(old).await;
            }
        }

        tracing::info!(product_id = id, "Product updated");

        self.get_product(id, true).await
    }

    /// 软删除：只把 is_active 置为 false，销售记录仍引用该商品
    pub async fn deactivate_product(&self, id: u64) -> Result<ProductView, AppError> {
        fetch_record(&self.state.db, id)
            .await?
            .ok_or_else(|| product_not_found(id))?;

        sqlx::query("UPDATE products SET is_active = FALSE WHERE id = ?")
            .bind(id)
            .execute(&self.state.db)
            .await?;

        tracing::info!(product_id = id, "Product deactivated");

        self.get_product(id, true).await
    }
}

async fn fetch_record<'c, E>(executor: E, id: u64) -> Result<Option<ProductRecord>, AppError>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let (sql, values) = product_by_id(id).build_sqlx(MysqlQueryBuilder);
    let record = sqlx::query_as_with::<_, ProductRecord, _>(&sql, values)
        .fetch_optional(executor)
        .await?;
    Ok(record)
}

/// SKU 精确匹配（已去空白），更新时排除自身
pub async fn ensure_sku_available(
    conn: &mut MySqlConnection,
    sku: &str,
    exclude_id: Option<u64>,
) -> Result<(), AppError> {
    let existing: Option<u64> = sqlx::query_scalar("SELECT id FROM products WHERE sku = ? AND id <> ? LIMIT 1")
        .bind(sku)
        .bind(exclude_id.unwrap_or(0))
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(_) => Err(AppError::Conflict(format!("A product with SKU '{}' already exists", sku))),
        None => Ok(()),
    }
}

fn sku_conflict(err: sqlx::Error) -> AppError {
    let err = AppError::from(err);
    if err.is_unique_violation() {
        AppError::Conflict("A product with this SKU already exists".to_string())
    } else {
        err
    }
}

fn product_not_found(id: u64) -> AppError {
    AppError::NotFound(format!("Product with ID {} not found", id))
}
