use crate::{
    auth::auth::AuthUser,
    error::{AppError, is_duplicate_key},
    model::center::{Center, default_opening_time},
    utils::{
        center_cache::{self, CENTER_COLUMNS},
        db_utils::{CENTERS, Page, build_update_sql, execute_update, like_pattern},
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateCenter {
    #[schema(example = "Sunshine Kids")]
    pub name: String,
    #[schema(example = "12 Main St")]
    pub address: String,
    #[schema(example = "+6491234567")]
    pub phone: String,
    #[schema(example = "hello@sunshine.example", format = "email")]
    pub email: String,
    #[schema(example = 40)]
    pub capacity: i32,
    /// Defaults to 08:30:00
    #[schema(example = "08:30:00", value_type = Option<String>, format = "time")]
    pub opening_time: Option<NaiveTime>,
}

/// Any subset of fields; unknown fields are rejected.
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct UpdateCenter {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub capacity: Option<i32>,
    #[schema(example = "08:00:00", value_type = Option<String>, format = "time")]
    pub opening_time: Option<NaiveTime>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CenterQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Search by name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CenterListResponse {
    pub data: Vec<Center>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

/// Rejects a `center_id` that names no center. `None` is always accepted.
pub async fn ensure_center_exists(
    pool: &MySqlPool,
    center_id: Option<u64>,
) -> Result<(), AppError> {
    let Some(id) = center_id else {
        return Ok(());
    };
    match center_cache::get(pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::bad_request("Center does not exist")),
    }
}

/// Create Center
#[utoipa::path(
    post,
    path = "/api/centers",
    request_body = CreateCenter,
    responses(
        (status = 201, description = "Center created", body = Center),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already used by another center")
    ),
    tag = "Center",
    security(("bearer_auth" = []))
)]
pub async fn create_center(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCenter>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("Center name is required"));
    }
    if payload.capacity < 0 {
        return Err(AppError::bad_request("Capacity cannot be negative"));
    }

    let opening_time = payload.opening_time.unwrap_or_else(default_opening_time);

    let result = sqlx::query(
        r#"
        INSERT INTO centers (name, address, phone, email, capacity, opening_time)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.address)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(payload.capacity)
    .bind(opening_time)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            return AppError::conflict("A center with this email already exists");
        }
        error!(error = %e, "Failed to create center");
        AppError::Internal
    })?;

    let center = Center {
        id: result.last_insert_id(),
        name: payload.name.trim().to_string(),
        address: payload.address.clone(),
        phone: payload.phone.clone(),
        email: payload.email.clone(),
        capacity: payload.capacity,
        opening_time,
    };
    center_cache::put(&center).await;

    info!(center_id = center.id, user_id = auth.user_id, "Center created");
    Ok(HttpResponse::Created().json(center))
}

#[utoipa::path(
    get,
    path = "/api/centers",
    params(CenterQuery),
    responses(
        (status = 200, description = "Paginated center list", body = CenterListResponse)
    ),
    tag = "Center",
    security(("bearer_auth" = []))
)]
pub async fn list_centers(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CenterQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page, 20);
    let search = query.search.as_deref().map(like_pattern);

    let where_clause = if search.is_some() { "WHERE name LIKE ?" } else { "" };

    let count_sql = format!("SELECT COUNT(*) FROM centers {}", where_clause);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(s) = &search {
        count_q = count_q.bind(s);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM centers {} ORDER BY name LIMIT ? OFFSET ?",
        CENTER_COLUMNS, where_clause
    );
    let mut data_q = sqlx::query_as::<_, Center>(&data_sql);
    if let Some(s) = &search {
        data_q = data_q.bind(s);
    }
    let data = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(CenterListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/centers/{center_id}",
    params(("center_id", Path, description = "Center ID")),
    responses(
        (status = 200, description = "Center found", body = Center),
        (status = 404, description = "Center not found", body = Object, example = json!({
            "message": "Center not found"
        }))
    ),
    tag = "Center",
    security(("bearer_auth" = []))
)]
pub async fn get_center(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let center_id = path.into_inner();

    match center_cache::get(pool.get_ref(), center_id).await? {
        Some(center) => Ok(HttpResponse::Ok().json(center)),
        None => Err(AppError::not_found("Center not found")),
    }
}

#[utoipa::path(
    put,
    path = "/api/centers/{center_id}",
    params(("center_id", Path, description = "Center ID")),
    request_body = UpdateCenter,
    responses(
        (status = 200, description = "Center updated"),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Center not found")
    ),
    tag = "Center",
    security(("bearer_auth" = []))
)]
pub async fn update_center(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let center_id = path.into_inner();

    let update = build_update_sql(&CENTERS, &body, center_id)?;
    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            return AppError::conflict("A center with this email already exists");
        }
        error!(error = %e, center_id, "Failed to update center");
        AppError::Internal
    })?;

    center_cache::invalidate(center_id).await;

    if affected == 0 {
        return Err(AppError::not_found("Center not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Center updated successfully"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/centers/{center_id}",
    params(("center_id", Path, description = "Center ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Center not found")
    ),
    tag = "Center",
    security(("bearer_auth" = []))
)]
pub async fn delete_center(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let center_id = path.into_inner();

    let res = sqlx::query("DELETE FROM centers WHERE id = ?")
        .bind(center_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, center_id, "Failed to delete center");
            AppError::Internal
        })?;

    center_cache::invalidate(center_id).await;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Center not found"));
    }

    info!(center_id, user_id = auth.user_id, "Center deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::models::TokenSubject;
    use actix_web::{App, http::StatusCode, test};

    fn bearer(role: u8) -> String {
        let subject = TokenSubject {
            user_id: 2,
            username: "ms.amy".into(),
            role,
            teacher_id: Some(1),
            center_id: Some(1),
        };
        let token = generate_access_token(&subject, &Config::for_tests().jwt_secret, 60).unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn teachers_cannot_create_centers() {
        let pool = MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(pool))
                .route("/centers", web::post().to(create_center)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/centers")
            .insert_header(("Authorization", bearer(2)))
            .set_json(json!({
                "name": "Little Oaks",
                "address": "1 Road",
                "phone": "000",
                "email": "oaks@example.com",
                "capacity": 10
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Admin only");
    }

    #[actix_web::test]
    async fn admin_blank_name_is_rejected_before_insert() {
        let pool = MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(pool))
                .route("/centers", web::post().to(create_center)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/centers")
            .insert_header(("Authorization", bearer(1)))
            .set_json(json!({
                "name": "  ",
                "address": "1 Road",
                "phone": "000",
                "email": "oaks@example.com",
                "capacity": 10
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn center_check_skips_missing_ids_and_uses_the_cache() {
        let pool = MySqlPool::connect_lazy("mysql://nobody@127.0.0.1:1/none").unwrap();
        assert!(ensure_center_exists(&pool, None).await.is_ok());

        center_cache::put(&Center {
            id: 91_001,
            name: "Little Oaks".into(),
            address: "1 Road".into(),
            phone: "000".into(),
            email: "oaks@example.com".into(),
            capacity: 10,
            opening_time: default_opening_time(),
        })
        .await;
        assert!(ensure_center_exists(&pool, Some(91_001)).await.is_ok());
    }
}
