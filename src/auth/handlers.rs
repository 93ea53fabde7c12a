use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, is_duplicate_key},
    model::{
        role::Role,
        user::{Me, UserWithProfile},
    },
    models::{Claims, LoginReqDto, TokenSubject, TokenType, UserReq},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

#[derive(Serialize, Deserialize)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RefreshRecord {
    id: u64,
    user_id: u64,
    revoked: bool,
    is_active: bool,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    error!(error = %e, "Failed to sign token");
    AppError::Internal
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(taken == 0)
}

async fn store_refresh_token(pool: &MySqlPool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

/// New staff accounts are always teachers; admins are provisioned in the database.
pub async fn register(
    user: web::Json<UserReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::bad_request("Username and password must not be empty"));
    }

    if !is_username_available(username, pool.get_ref()).await? {
        return Err(AppError::conflict("Username already taken"));
    }

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::Internal
    })?;

    sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(Role::Teacher.id())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            // lost a race with another registration
            if is_duplicate_key(&e) {
                return AppError::conflict("Username already exists");
            }
            error!(error = %e, "Failed to register user");
            AppError::Internal
        })?;

    info!(username, "User registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::bad_request("Username or password required"));
    }

    // 2️⃣ Fetch user with its teacher profile
    let db_user = sqlx::query_as::<_, UserWithProfile>(
        r#"
        SELECT u.id, u.username, u.password, u.role_id, u.is_active,
               t.id AS teacher_id, t.center_id
        FROM users u
        LEFT JOIN teachers t ON t.user_id = u.id
        WHERE u.username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        AppError::Unauthorized("Invalid credentials".into())
    })?;
    debug!(user_id = db_user.id, "User found");

    // 3️⃣ Verify password
    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(AppError::Forbidden("Account is disabled".into()));
    }

    // 4️⃣ Issue tokens
    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
        teacher_id: db_user.teacher_id,
        center_id: db_user.center_id,
    };
    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    // 5️⃣ Store refresh token
    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), &refresh_claims).await?;

    // 6️⃣ Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token,
    }))
}

/// Rotates a refresh token sent as `Authorization: Bearer <refresh_token>`.
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, RefreshRecord>(
        r#"
        SELECT r.id, r.user_id, r.revoked, u.is_active
        FROM refresh_tokens r
        JOIN users u ON u.id = r.user_id
        WHERE r.jti = ?
        FOR UPDATE
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await?;

    let record = match record {
        Some(r) if !r.revoked && r.is_active => r,
        _ => return Err(AppError::Unauthorized("Refresh token revoked".into())),
    };

    // revoke old refresh token
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record.id)
        .execute(&mut *tx)
        .await?;

    let subject = TokenSubject::from(&claims);
    let (new_refresh_token, new_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record.user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;

    debug!(user_id = record.user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

/// Revokes the refresh token in the Authorization header. Always 204.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(Me {
        user_id: auth.user_id,
        username: auth.username,
        role: auth.role,
        teacher_id: auth.teacher_id,
        center_id: auth.center_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    fn lazy_pool() -> MySqlPool {
        MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap()
    }

    #[actix_web::test]
    async fn register_rejects_blank_credentials() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .route("/register", web::post().to(register)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "  ", "password": "secret"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Username and password must not be empty");
    }

    #[actix_web::test]
    async fn logout_without_token_is_no_content() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/logout", web::post().to(logout)),
        )
        .await;

        let req = test::TestRequest::post().uri("/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn refresh_rejects_access_tokens() {
        let config = Config::for_tests();
        let subject = TokenSubject {
            user_id: 1,
            username: "admin".into(),
            role: Role::Admin.id(),
            teacher_id: None,
            center_id: None,
        };
        let access = generate_access_token(&subject, &config.jwt_secret, 60).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config))
                .route("/refresh", web::post().to(refresh_token)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/refresh")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn me_echoes_token_identity() {
        let config = Config::for_tests();
        let subject = TokenSubject {
            user_id: 5,
            username: "ms.amy".into(),
            role: Role::Teacher.id(),
            teacher_id: Some(2),
            center_id: Some(1),
        };
        let access = generate_access_token(&subject, &config.jwt_secret, 60).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .route("/me", web::get().to(me)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user_id"], 5);
        assert_eq!(body["role"], "teacher");
        assert_eq!(body["center_id"], 1);
    }
}
