use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::models::user::{Role, User, UserProfile};
use crate::error::AppError;
use crate::infrastructure::mail::{password_reset_mail, verification_mail};
use crate::server::AppState;

/// 邮箱验证令牌有效期
pub const EMAIL_TOKEN_TTL_HOURS: i64 = 24;
/// 重置密码令牌有效期
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

const TOKEN_LEN: usize = 64;

const USER_COLUMNS: &str = "id, email, password, name, lastname, role, email_verified, email_token, \
     email_token_expires, reset_password_token, reset_password_expires, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // 用户 ID
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(user: &User, now: DateTime<Utc>, ttl_hours: u64) -> Self {
        let exp = now + Duration::hours(ttl_hours as i64);
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        }
    }
}

pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, AppError> {
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

    Ok(token_data.claims)
}

/// 单次使用的随机令牌
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn token_is_live(expires: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expires, Some(expires) if expires > now)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// argon2 计算量较大，放到阻塞线程池
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))??;

    Ok(hashed)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)?;
        Ok::<_, argon2::password_hash::Error>(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))??;

    Ok(valid)
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct LoginResult {
    pub token: String,
    pub user: UserProfile,
}

pub struct AuthService {
    state: Arc<AppState>,
}

impl AuthService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn register(&self, registration: Registration) -> Result<UserProfile, AppError> {
        let email = normalize_email(&registration.email);

        // 检查邮箱是否已存在
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password = hash_password(registration.password).await?;
        let token = generate_token();
        let expires = Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS);

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password, name, lastname, role, email_verified, email_token, email_token_expires)
            VALUES (?, ?, ?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&password)
        .bind(registration.name.trim())
        .bind(registration.lastname.trim())
        .bind(Role::User.to_string())
        .bind(&token)
        .bind(expires)
        .execute(&self.state.db)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                err
            }
        })?;

        let user = self.find_by_id(result.last_insert_id()).await?;
        tracing::info!(user_id = user.id, email = %user.email, "User registered");

        // 发送失败不影响注册，用户可以重新发送验证邮件
        let mail = verification_mail(&self.state.config.frontend.url, &user.email, &user.name, &token);
        if let Err(e) = self.state.mailer.send(mail).await {
            tracing::error!(user_id = user.id, error = %e, "Failed to send verification email");
        }

        Ok(UserProfile::from(&user))
    }

    /// 依次检查：用户存在、密码正确、邮箱已验证
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let email = normalize_email(email);
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password(password.to_string(), user.password.clone()).await? {
            return Err(AppError::Auth("Invalid password".to_string()));
        }

        if !user.email_verified {
            return Err(AppError::Unverified { email: user.email });
        }

        let claims = Claims::new(&user, Utc::now(), self.state.config.auth.token_expiry_hours);
        let token = issue_token(&self.state.config.auth.jwt_secret, &claims)?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResult {
            token,
            user: UserProfile::from(&user),
        })
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AppError> {
        let invalid = || AppError::Validation("Invalid or expired verification token".to_string());

        let user = self
            .find_by_column("email_token", token)
            .await?
            .ok_or_else(invalid)?;

        if !token_is_live(user.email_token_expires, Utc::now()) {
            return Err(invalid());
        }

        // 带上令牌条件，保证同一令牌只会被消费一次
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, email_token = NULL, email_token_expires = NULL
            WHERE id = ? AND email_token = ?
            "#,
        )
        .bind(user.id)
        .bind(token)
        .execute(&self.state.db)
        .await?;

        if result.rows_affected() != 1 {
            return Err(invalid());
        }

        tracing::info!(user_id = user.id, "Email verified");
        Ok(())
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.email_verified {
            return Err(AppError::Validation("Email is already verified".to_string()));
        }

        let token = generate_token();
        let expires = Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS);

        sqlx::query("UPDATE users SET email_token = ?, email_token_expires = ? WHERE id = ?")
            .bind(&token)
            .bind(expires)
            .bind(user.id)
            .execute(&self.state.db)
            .await?;

        let mail = verification_mail(&self.state.config.frontend.url, &user.email, &user.name, &token);
        self.state.mailer.send(mail).await?;

        tracing::info!(user_id = user.id, "Verification email resent");
        Ok(())
    }

    /// 邮箱不存在时同样返回成功
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.find_by_email(&normalize_email(email)).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        if !user.email_verified {
            return Err(AppError::Validation(
                "Please verify your email before resetting your password".to_string(),
            ));
        }

        let token = generate_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query("UPDATE users SET reset_password_token = ?, reset_password_expires = ? WHERE id = ?")
            .bind(&token)
            .bind(expires)
            .bind(user.id)
            .execute(&self.state.db)
            .await?;

        let mail = password_reset_mail(&self.state.config.frontend.url, &user.email, &user.name, &token);
        if let Err(e) = self.state.mailer.send(mail).await {
            tracing::error!(user_id = user.id, error = %e, "Failed to send password reset email");
        }

        Ok(())
    }

    pub async fn verify_reset_token(&self, token: &str) -> Result<(), AppError> {
        match self.find_by_column("reset_password_token", token).await? {
            Some(user) if token_is_live(user.reset_password_expires, Utc::now()) => Ok(()),
            _ => Err(invalid_reset_token()),
        }
    }

    pub async fn reset_password(&self, token: &str, new_password: String) -> Result<(), AppError> {
        let user = self
            .find_by_column("reset_password_token", token)
            .await?
            .ok_or_else(invalid_reset_token)?;

        // 过期令牌直接作废
        if !token_is_live(user.reset_password_expires, Utc::now()) {
            self.clear_reset_token(user.id).await?;
            return Err(invalid_reset_token());
        }

        let password = hash_password(new_password).await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password = ?, reset_password_token = NULL, reset_password_expires = NULL
            WHERE id = ? AND reset_password_token = ?
            "#,
        )
        .bind(&password)
        .bind(user.id)
        .bind(token)
        .execute(&self.state.db)
        .await?;

        if result.rows_affected() != 1 {
            return Err(invalid_reset_token());
        }

        tracing::info!(user_id = user.id, "Password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: u64) -> Result<UserProfile, AppError> {
        let user = self.find_by_id(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    async fn clear_reset_token(&self, user_id: u64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET reset_password_token = NULL, reset_password_expires = NULL WHERE id = ?")
            .bind(user_id)
            .execute(&self.state.db)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: u64) -> Result<User, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_by_column("email", email).await
    }

    /// `column` 只接受内部常量
    async fn find_by_column(&self, column: &'static str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.state.db)
            .await?;
        Ok(user)
    }
}

fn invalid_reset_token() -> AppError {
    AppError::Validation("Invalid or expired reset token".to_string())
}
