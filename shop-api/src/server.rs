use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::api::{auth, categories, products, sales};
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::mail::Mailer;
use crate::infrastructure::storage::ImageStore;

/// multipart 中除图片外的文本字段预留空间
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: sqlx::MySqlPool,
    pub mailer: Arc<dyn Mailer>,
    pub images: ImageStore,
}

pub async fn create_app(state: AppState) -> Result<Router, AppError> {
    let body_limit = state.config.upload.max_bytes + FORM_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config)?;
    let uploads = ServeDir::new(state.images.dir());
    let app_state = Arc::new(state);

    // 健康检查路由
    let health_route = Router::new().route("/health", get(|| async { "OK" }));

    // API 路由，权限由各处理函数的提取器声明
    let api_routes = Router::new()
        .nest("/auth", auth::routes())
        .nest("/products", products::routes())
        .nest("/categories", categories::routes())
        .nest("/sales", sales::routes());

    // 组合所有路由
    let app = Router::new()
        .merge(api_routes)
        .merge(health_route)
        .nest_service("/uploads/products", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    Ok(app)
}

/// 只允许配置的前端地址跨域访问
fn cors_layer(config: &Config) -> Result<CorsLayer, AppError> {
    let origin = config
        .frontend
        .url
        .trim_end_matches('/')
        .parse::<HeaderValue>()
        .map_err(|e| AppError::Internal(format!("Invalid frontend.url for CORS: {}", e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::infrastructure::database::mysql::lazy_mysql;
    use crate::infrastructure::mail::testing::RecordingMailer;

    let config = crate::config::test_config();
    AppState {
        db: lazy_mysql(&config).unwrap(),
        mailer: Arc::new(RecordingMailer::default()),
        images: ImageStore::new(config.product_upload_dir(), config.upload.max_bytes),
        config,
    }
}
