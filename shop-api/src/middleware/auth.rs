//! 认证提取器
//!
//! 处理函数通过参数声明所需权限：`AuthUser` 要求已登录，`AdminUser` 还要求管理员角色。

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::domain::models::user::Role;
use crate::domain::services::auth_service::decode_token;
use crate::error::AppError;
use crate::server::AppState;

/// 当前请求的登录用户，来自 Bearer 令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: u64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        // 从请求头获取令牌
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

        let claims = decode_token(&state.config.auth.jwt_secret, token.trim())?;
        let id = claims
            .sub
            .parse()
            .map_err(|_| AppError::Auth("Invalid token subject".to_string()))?;

        let user = AuthUser {
            id,
            email: claims.email,
            role: claims.role,
        };
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}

/// 管理员
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, uri = %parts.uri, "Admin route denied");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
