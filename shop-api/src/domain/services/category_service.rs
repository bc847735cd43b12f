use std::sync::Arc;

use sqlx::MySqlConnection;

use crate::domain::models::category::Category;
use crate::domain::validation::{validate_category_id, validate_category_name};
use crate::error::AppError;
use crate::server::AppState;

/// 商品请求里的分类引用，`categoryId` 与 `categoryName` 只能二选一
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryInput {
    Id(u64),
    Name(String),
}

impl CategoryInput {
    pub fn from_fields(id: Option<&str>, name: Option<&str>) -> Result<Option<Self>, AppError> {
        match (id, name) {
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either categoryId or categoryName, not both".to_string(),
            )),
            (Some(id), None) => Ok(Some(CategoryInput::Id(validate_category_id(id)?))),
            (None, Some(name)) => Ok(Some(CategoryInput::Name(validate_category_name(name)?))),
            (None, None) => Ok(None),
        }
    }
}

/// 解析结果：已有分类，或需要在同一事务中新建
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCategory {
    Existing(Category),
    Create(String),
}

impl ResolvedCategory {
    pub async fn persist(self, conn: &mut MySqlConnection) -> Result<Category, AppError> {
        let name = match self {
            ResolvedCategory::Existing(category) => return Ok(category),
            ResolvedCategory::Create(name) => name,
        };

        let inserted = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(&name)
            .execute(&mut *conn)
            .await;

        match inserted {
            Ok(result) => {
                tracing::info!(category = %name, "Category created");
                Ok(Category {
                    id: result.last_insert_id(),
                    name,
                })
            }
            // 并发请求抢先创建了同名分类
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => find_committed_by_name(conn, &name)
                .await?
                .ok_or_else(|| AppError::Internal(format!("category '{}' vanished after conflict", name))),
            Err(e) => Err(e.into()),
        }
    }
}

/// 按 id 校验存在，或按名称（不区分大小写）查找
pub async fn resolve(conn: &mut MySqlConnection, input: &CategoryInput) -> Result<ResolvedCategory, AppError> {
    match input {
        CategoryInput::Id(id) => {
            let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Category with ID {} not found", id)))?;
            Ok(ResolvedCategory::Existing(category))
        }
        CategoryInput::Name(name) => Ok(match find_by_name(conn, name).await? {
            Some(category) => ResolvedCategory::Existing(category),
            None => ResolvedCategory::Create(name.clone()),
        }),
    }
}

async fn find_by_name(conn: &mut MySqlConnection, name: &str) -> Result<Option<Category>, AppError> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE LOWER(name) = LOWER(?)")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(category)
}

/// 加锁读，越过事务快照读取其他事务已提交的行
async fn find_committed_by_name(conn: &mut MySqlConnection, name: &str) -> Result<Option<Category>, AppError> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name FROM categories WHERE LOWER(name) = LOWER(?) LIMIT 1 FOR SHARE",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(category)
}

pub struct CategoryService {
    state: Arc<AppState>,
}

impl CategoryService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&self.state.db)
            .await?;
        Ok(categories)
    }
}
