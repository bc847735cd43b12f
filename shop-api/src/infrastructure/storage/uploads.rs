//! 商品图片存储
//!
//! 上传的文件先落盘再做字段校验，所以落盘后返回一个 `StoredUpload` 守卫：
//! 只有显式调用 `keep()` 的文件会保留，其余任何退出路径都会在 drop 时删除。

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::AppError;

/// 支持的图片格式
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// 校验后以随机文件名写入磁盘
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<StoredUpload, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded image is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "Image too large. Maximum size is {} bytes",
                self.max_bytes
            )));
        }

        let ext = image_extension(original_name)?;
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&filename);

        self.ensure_dir().await?;
        fs::write(&path, data).await?;
        tracing::debug!(file = %filename, size = data.len(), "Product image stored");

        Ok(StoredUpload {
            path,
            filename,
            keep: false,
        })
    }

    /// 删除旧图片，失败只记录日志
    pub async fn remove(&self, filename: &str) {
        let Some(name) = Path::new(filename).file_name() else {
            return;
        };
        let path = self.dir.join(name);

        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(file = %filename, "Product image removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file = %filename, error = %e, "Failed to remove product image"),
        }
    }
}

fn image_extension(original_name: &str) -> Result<String, AppError> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AppError::Validation(format!("Invalid file extension for: {}", original_name)))?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported image format '{}'. Supported: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    Ok(ext)
}

/// 已写入磁盘的上传文件
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    filename: String,
    keep: bool,
}

impl StoredUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// 数据库写入成功后调用，返回保存的文件名
    pub fn keep(mut self) -> String {
        self.keep = true;
        std::mem::take(&mut self.filename)
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        // drop 不能 await；单个小文件，同步删除
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(file = %self.filename, "Discarded uploaded image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file = %self.filename, error = %e, "Failed to clean up uploaded image"),
        }
    }
}
