use shop_api::config::Config;
use shop_api::error::AppError;
use shop_api::infrastructure::database::mysql::init_mysql;
use shop_api::infrastructure::mail::init_mailer;
use shop_api::infrastructure::storage::ImageStore;
use shop_api::logging::init_logging;
use shop_api::server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    init_logging(&config)?;

    tracing::info!(environment = %config.server.environment, "Starting shop API service");

    // 初始化数据库连接
    let db_pool = init_mysql(&config).await?;
    let mailer = init_mailer(&config)?;

    let images = ImageStore::new(config.product_upload_dir(), config.upload.max_bytes);
    images.ensure_dir().await?;

    // 创建应用状态
    let app_state = AppState {
        config: config.clone(),
        db: db_pool.clone(),
        mailer,
        images,
    };

    // 创建并启动服务器
    let app = create_app(app_state).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", &addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Ctrl+C 或 SIGTERM 时停止接收新请求
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
