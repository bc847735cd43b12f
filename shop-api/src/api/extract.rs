//! 请求体提取器
//!
//! 把 axum 自带提取器的拒绝统一转换成 `AppError`，保证错误响应始终是 `{"error": ...}` 结构。

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::domain::validation::ProductFields;
use crate::error::AppError;
use crate::infrastructure::storage::StoredUpload;
use crate::server::AppState;

/// 图片字段名
pub const IMAGE_FIELD: &str = "image";

/// JSON 请求体，解析失败返回 400
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// 解析后再执行 `validator` 规则，所有字段错误合并到 `errors` 数组
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// 商品表单：multipart（可带图片）或 JSON
///
/// multipart 中的图片在解析阶段就已落盘，之后任何校验失败都会随 `StoredUpload` 的 drop 删除。
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: ProductFields,
    pub image: Option<StoredUpload>,
}

impl FromRequest<Arc<AppState>> for ProductForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(fields) = JsonBody::<ProductFields>::from_request(req, state).await?;
            return Ok(ProductForm { fields, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        let mut form = ProductForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;

                // 前端未选择文件时会提交一个空的文件字段
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }

                form.image = Some(state.images.store(&file_name, &data).await?);
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            if !form.fields.set(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown product form field");
            }
        }

        Ok(form)
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}
