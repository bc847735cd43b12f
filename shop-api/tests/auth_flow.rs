mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{spawn_app, unique};

#[tokio::test]
#[ignore] // 需要数据库，所以默认忽略
async fn register_verify_then_login() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let email = format!("{}@Example.com", unique("ana"));
    let normalized = email.to_lowercase();

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/register",
            None,
            json!({"name": "Ana", "lastname": "Lopez", "email": email, "password": "secret1"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["requiresVerification"], true);
    assert_eq!(body["user"]["email"], normalized);

    // 重复注册
    let (status, _) = app
        .json(
            Method::POST,
            "/auth/register",
            None,
            json!({"name": "Ana", "lastname": "Lopez", "email": normalized, "password": "secret1"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // 未验证时登录
    let login = json!({"email": normalized, "password": "secret1"});
    let (status, body) = app.json(Method::POST, "/auth/login", None, login.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["requiresVerification"], true);
    assert_eq!(body["email"], normalized);

    let token: String = sqlx::query_scalar("SELECT email_token FROM users WHERE email = ?")
        .bind(&normalized)
        .fetch_one(&app.db)
        .await?;
    {
        let sent = app.mailer.sent.lock().unwrap();
        assert!(sent.iter().any(|mail| mail.to == normalized && mail.html.contains(&token)));
    }

    let (status, _) = app
        .json(Method::POST, "/auth/verify-email", None, json!({"token": token}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // 令牌只能使用一次
    let (status, _) = app
        .json(Method::POST, "/auth/verify-email", None, json!({"token": token}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.json(Method::POST, "/auth/login", None, login).await?;
    assert_eq!(status, StatusCode::OK);
    let jwt = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/auth/me", &jwt).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["emailVerified"], true);
    assert_eq!(body["user"]["role"], "user");

    Ok(())
}

#[tokio::test]
#[ignore] // 需要数据库，所以默认忽略
async fn login_distinguishes_unknown_user_and_bad_password() -> anyhow::Result<()> {
    let app = spawn_app().await?;

    let (status, _) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": format!("{}@example.com", unique("ghost")), "password": "whatever"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let email = format!("{}@example.com", unique("bob"));
    app.json(
        Method::POST,
        "/auth/register",
        None,
        json!({"name": "Bob", "lastname": "Stone", "email": email, "password": "secret1"}),
    )
    .await?;

    let (status, _) = app
        .json(Method::POST, "/auth/login", None, json!({"email": email, "password": "wrong-pass"}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
#[ignore] // 需要数据库，所以默认忽略
async fn expired_verification_token_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let email = format!("{}@example.com", unique("late"));

    app.json(
        Method::POST,
        "/auth/register",
        None,
        json!({"name": "Late", "lastname": "Comer", "email": email, "password": "secret1"}),
    )
    .await?;

    sqlx::query("UPDATE users SET email_token_expires = NOW() - INTERVAL 1 HOUR WHERE email = ?")
        .bind(&email)
        .execute(&app.db)
        .await?;
    let token: String = sqlx::query_scalar("SELECT email_token FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&app.db)
        .await?;

    let (status, _) = app
        .json(Method::POST, "/auth/verify-email", None, json!({"token": token}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 重新发送后可以验证
    let (status, _) = app
        .json(Method::POST, "/auth/resend-verification", None, json!({"email": email}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let fresh: String = sqlx::query_scalar("SELECT email_token FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&app.db)
        .await?;
    assert_ne!(fresh, token);

    let (status, _) = app
        .json(Method::POST, "/auth/verify-email", None, json!({"token": fresh}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::POST, "/auth/resend-verification", None, json!({"email": email}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
#[ignore] // 需要数据库，所以默认忽略
async fn password_reset_token_is_single_use() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let email = format!("{}@example.com", unique("reset"));

    app.json(
        Method::POST,
        "/auth/register",
        None,
        json!({"name": "Rita", "lastname": "Reset", "email": email, "password": "secret1"}),
    )
    .await?;

    // 未验证邮箱不能重置密码
    let (status, _) = app
        .json(Method::POST, "/auth/request-password-reset", None, json!({"email": email}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    sqlx::query("UPDATE users SET email_verified = TRUE WHERE email = ?")
        .bind(&email)
        .execute(&app.db)
        .await?;

    // 不存在的邮箱同样返回成功
    let (status, unknown) = app
        .json(
            Method::POST,
            "/auth/request-password-reset",
            None,
            json!({"email": format!("{}@example.com", unique("nobody"))}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, known) = app
        .json(Method::POST, "/auth/request-password-reset", None, json!({"email": email}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(known, unknown);

    let token: String = sqlx::query_scalar("SELECT reset_password_token FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&app.db)
        .await?;

    let (status, body) = app
        .json(Method::POST, "/auth/verify-reset-token", None, json!({"token": token}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let reset = json!({"token": token, "password": "brand-new"});
    let (status, _) = app
        .json(Method::POST, "/auth/reset-password", None, reset.clone())
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.json(Method::POST, "/auth/reset-password", None, reset).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::POST, "/auth/login", None, json!({"email": email, "password": "brand-new"}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
