use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::services::category_service::CategoryService;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_categories))
}

async fn list_categories(State(state): State<Arc<AppState>>, _user: AuthUser) -> Result<Json<Value>, AppError> {
    let categories = CategoryService::new(state).list_categories().await?;

    Ok(Json(json!({ "categories": categories })))
}
