use crate::{
    api::center::ensure_center_exists,
    auth::auth::AuthUser,
    error::{AppError, is_duplicate_key, is_foreign_key_violation},
    model::teacher::Teacher,
    utils::db_utils::{Page, TEACHERS, build_update_sql, execute_update, referenced_id},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

const TEACHER_COLUMNS: &str = "id, user_id, center_id, position, profile_picture";
const DEFAULT_POSITION: &str = "Teacher";

#[derive(Deserialize, ToSchema)]
pub struct CreateTeacher {
    /// An existing staff user
    #[schema(example = 4)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub center_id: Option<u64>,
    #[schema(example = "Lead Teacher")]
    pub position: Option<String>,
    pub profile_picture: Option<String>,
}

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct UpdateTeacher {
    pub center_id: Option<u64>,
    pub position: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherQuery {
    pub center_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct TeacherListResponse {
    pub data: Vec<Teacher>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacher,
    responses(
        (status = 201, description = "Teacher profile created", body = Teacher),
        (status = 400, description = "User or center does not exist"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "User already has a teacher profile")
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn create_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTeacher>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(payload.user_id)
        .fetch_one(pool.get_ref())
        .await?;
    if user_count == 0 {
        return Err(AppError::bad_request("User does not exist"));
    }
    ensure_center_exists(pool.get_ref(), payload.center_id).await?;

    let position = payload
        .position
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_POSITION)
        .to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO teachers (user_id, center_id, position, profile_picture)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.center_id)
    .bind(&position)
    .bind(&payload.profile_picture)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            return AppError::conflict("This user already has a teacher profile");
        }
        if is_foreign_key_violation(&e) {
            return AppError::bad_request("User or center does not exist");
        }
        error!(error = %e, user_id = payload.user_id, "Failed to create teacher");
        AppError::Internal
    })?;

    let teacher = Teacher {
        id: result.last_insert_id(),
        user_id: payload.user_id,
        center_id: payload.center_id,
        position,
        profile_picture: payload.profile_picture.clone(),
    };

    info!(teacher_id = teacher.id, admin_id = auth.user_id, "Teacher profile created");
    Ok(HttpResponse::Created().json(teacher))
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherQuery),
    responses(
        (status = 200, description = "Paginated teacher list", body = TeacherListResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn list_teachers(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeacherQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let page = Page::new(query.page, query.per_page, 20);
    let where_clause = if query.center_id.is_some() { "WHERE center_id = ?" } else { "" };

    let count_sql = format!("SELECT COUNT(*) FROM teachers {}", where_clause);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = query.center_id {
        count_q = count_q.bind(id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM teachers {} ORDER BY id LIMIT ? OFFSET ?",
        TEACHER_COLUMNS, where_clause
    );
    let mut data_q = sqlx::query_as::<_, Teacher>(&data_sql);
    if let Some(id) = query.center_id {
        data_q = data_q.bind(id);
    }
    let data = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(TeacherListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id", Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher found", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn get_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let teacher_id = path.into_inner();

    let teacher = sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {} FROM teachers WHERE id = ?",
        TEACHER_COLUMNS
    ))
    .bind(teacher_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Teacher not found"))?;

    Ok(HttpResponse::Ok().json(teacher))
}

#[utoipa::path(
    put,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id", Path, description = "Teacher ID")),
    request_body = UpdateTeacher,
    responses(
        (status = 200, description = "Teacher updated"),
        (status = 400, description = "Unknown or invalid field, or unknown center"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn update_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let teacher_id = path.into_inner();

    ensure_center_exists(pool.get_ref(), referenced_id(&body, "center_id")?).await?;

    let update = build_update_sql(&TEACHERS, &body, teacher_id)?;
    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, teacher_id, "Failed to update teacher");
        AppError::Internal
    })?;

    if affected == 0 {
        return Err(AppError::not_found("Teacher not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Teacher updated successfully"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id", Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn delete_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let teacher_id = path.into_inner();

    let res = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(teacher_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, teacher_id, "Failed to delete teacher");
            AppError::Internal
        })?;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Teacher not found"));
    }

    info!(teacher_id, admin_id = auth.user_id, "Teacher deleted");
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

    fn token_for(role: u8, config: &Config) -> String {
        let subject = TokenSubject {
            user_id: 7,
            username: "mr.bo".into(),
            role,
            teacher_id: Some(3),
            center_id: Some(1),
        };
        generate_access_token(&subject, &config.jwt_secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn teacher_list_is_admin_only() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let token = token_for(2, &config);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .route("/teachers", web::get().to(list_teachers))
                .route("/teachers/{id}", web::delete().to(delete_teacher)),
        )
        .await;

        for req in [
            test::TestRequest::get().uri("/teachers"),
            test::TestRequest::delete().uri("/teachers/3"),
        ] {
            let req = req
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
    }

    #[actix_web::test]
    async fn non_numeric_center_is_rejected_before_update() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();
        let token = token_for(1, &config);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .route("/teachers/{id}", web::put().to(update_teacher)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/teachers/3")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"center_id": "north"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "center_id must be a number");
    }
}
