use crate::{
    api::{
        attendance::{CHILD_LISTING_SQL, child_day_rows, group_by_child, rows_between, status_for},
        center::ensure_center_exists,
    },
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, is_foreign_key_violation},
    model::{
        attendance::{Attendance, AttendanceStatus, DailyAttendance, DaySummary},
        child::{Child, ChildListing, Gender, picture_or_default},
        parent::Parent,
    },
    utils::{
        db_utils::{CHILDREN, Page, build_update_sql, execute_update, like_pattern, referenced_id},
        period::today,
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

pub const CHILD_COLUMNS: &str = "id, name, date_of_birth, gender, allergies, medical_conditions, \
     emergency_contact, emergency_phone, profile_picture, parent_id, center_id";

#[derive(Deserialize, ToSchema)]
pub struct CreateChild {
    #[schema(example = "Mia Jones")]
    pub name: String,
    #[schema(example = "2021-04-09", value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,
    #[schema(example = "Female")]
    pub gender: String,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    #[schema(example = "Tom Jones")]
    pub emergency_contact: String,
    #[schema(example = "0219876543")]
    pub emergency_phone: String,
    pub profile_picture: Option<String>,
    #[schema(example = 1)]
    pub parent_id: u64,
    #[schema(example = 1)]
    pub center_id: Option<u64>,
}

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct UpdateChild {
    pub name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub profile_picture: Option<String>,
    pub parent_id: Option<u64>,
    pub center_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ChildQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub parent_id: Option<u64>,
    pub center_id: Option<u64>,
    /// Search by child name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChildListResponse {
    pub data: Vec<Child>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Part of the child's or parent's name
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChildSearchHit {
    pub id: u64,
    pub name: String,
    pub parent_name: String,
    pub center_name: String,
    pub profile_picture: String,
    pub attendance_status: AttendanceStatus,
}

#[derive(Serialize, ToSchema)]
pub struct ChildProfile {
    pub child: Child,
    pub parent: Parent,
    pub center_name: String,
    pub profile_picture: String,
    pub today: DaySummary,
    /// Latest attendance rows, newest first
    pub recent_attendance: Vec<Attendance>,
}

const SEARCH_LIMIT: i64 = 20;

fn validate_gender(gender: &str) -> Result<(), AppError> {
    Gender::from_str(gender)
        .map(|_| ())
        .map_err(|_| AppError::bad_request("Gender must be Male, Female or Other"))
}

/// Builds search hits from listings and today's rows, in listing order.
pub fn search_hits(
    children: Vec<ChildListing>,
    rows: &[Attendance],
    default_picture: &str,
) -> Vec<ChildSearchHit> {
    let grouped = group_by_child(rows);
    children
        .into_iter()
        .map(|c| ChildSearchHit {
            attendance_status: status_for(&grouped, c.id),
            center_name: c.center_label().to_string(),
            profile_picture: picture_or_default(c.profile_picture.as_deref(), default_picture)
                .to_string(),
            id: c.id,
            name: c.name,
            parent_name: c.parent_name,
        })
        .collect()
}

async fn parent_exists(pool: &MySqlPool, parent_id: u64) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM parents WHERE id = ?")
        .bind(parent_id)
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

#[utoipa::path(
    post,
    path = "/api/children",
    request_body = CreateChild,
    responses(
        (status = 201, description = "Child registered", body = Child),
        (status = 400, description = "Invalid payload, unknown parent or unknown center")
    ),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn create_child(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateChild>,
) -> Result<HttpResponse, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Child name is required"));
    }
    validate_gender(&payload.gender)?;

    if !parent_exists(pool.get_ref(), payload.parent_id).await? {
        return Err(AppError::bad_request("Parent does not exist"));
    }
    ensure_center_exists(pool.get_ref(), payload.center_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO children
            (name, date_of_birth, gender, allergies, medical_conditions,
             emergency_contact, emergency_phone, profile_picture, parent_id, center_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(payload.date_of_birth)
    .bind(&payload.gender)
    .bind(&payload.allergies)
    .bind(&payload.medical_conditions)
    .bind(&payload.emergency_contact)
    .bind(&payload.emergency_phone)
    .bind(&payload.profile_picture)
    .bind(payload.parent_id)
    .bind(payload.center_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            return AppError::bad_request("Parent or center does not exist");
        }
        error!(error = %e, parent_id = payload.parent_id, "Failed to create child");
        AppError::Internal
    })?;

    let child = Child {
        id: result.last_insert_id(),
        name: name.to_string(),
        date_of_birth: payload.date_of_birth,
        gender: payload.gender.clone(),
        allergies: payload.allergies.clone(),
        medical_conditions: payload.medical_conditions.clone(),
        emergency_contact: payload.emergency_contact.clone(),
        emergency_phone: payload.emergency_phone.clone(),
        profile_picture: payload.profile_picture.clone(),
        parent_id: payload.parent_id,
        center_id: payload.center_id,
    };

    info!(child_id = child.id, user_id = auth.user_id, "Child registered");
    Ok(HttpResponse::Created().json(child))
}

#[utoipa::path(
    get,
    path = "/api/children",
    params(ChildQuery),
    responses((status = 200, description = "Paginated child list", body = ChildListResponse)),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn list_children(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ChildQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page, 20);
    let search = query.search.as_deref().map(like_pattern);

    let mut conditions: Vec<&str> = Vec::new();
    if query.parent_id.is_some() {
        conditions.push("parent_id = ?");
    }
    if query.center_id.is_some() {
        conditions.push("center_id = ?");
    }
    if search.is_some() {
        conditions.push("name LIKE ?");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM children {}", where_clause);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = query.parent_id {
        count_q = count_q.bind(id);
    }
    if let Some(id) = query.center_id {
        count_q = count_q.bind(id);
    }
    if let Some(s) = &search {
        count_q = count_q.bind(s);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM children {} ORDER BY name LIMIT ? OFFSET ?",
        CHILD_COLUMNS, where_clause
    );
    let mut data_q = sqlx::query_as::<_, Child>(&data_sql);
    if let Some(id) = query.parent_id {
        data_q = data_q.bind(id);
    }
    if let Some(id) = query.center_id {
        data_q = data_q.bind(id);
    }
    if let Some(s) = &search {
        data_q = data_q.bind(s);
    }
    let data = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(ChildListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Quick search used by the sign-in screen
#[utoipa::path(
    get,
    path = "/api/children/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching children with today's status", body = [ChildSearchHit])),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn search_children(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<ChildSearchHit>::new()));
    }
    let pattern = like_pattern(term);

    let children = sqlx::query_as::<_, ChildListing>(&format!(
        "{} WHERE c.name LIKE ? OR p.name LIKE ? ORDER BY c.name LIMIT ?",
        CHILD_LISTING_SQL
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(SEARCH_LIMIT)
    .fetch_all(pool.get_ref())
    .await?;

    let date = today();
    let rows = if children.is_empty() {
        Vec::new()
    } else {
        rows_between(pool.get_ref(), date, date, None).await?
    };

    Ok(HttpResponse::Ok().json(search_hits(children, &rows, &config.default_profile_picture)))
}

#[utoipa::path(
    get,
    path = "/api/children/{child_id}",
    params(("child_id", Path, description = "Child ID")),
    responses(
        (status = 200, description = "Child found", body = Child),
        (status = 404, description = "Child not found")
    ),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn get_child(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();

    let child = sqlx::query_as::<_, Child>(&format!(
        "SELECT {} FROM children WHERE id = ?",
        CHILD_COLUMNS
    ))
    .bind(child_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Child not found"))?;

    Ok(HttpResponse::Ok().json(child))
}

#[utoipa::path(
    get,
    path = "/api/children/{child_id}/profile",
    params(("child_id", Path, description = "Child ID")),
    responses(
        (status = 200, description = "Profile with parent and recent attendance", body = ChildProfile),
        (status = 404, description = "Child not found", body = Object, example = json!({
            "message": "Child not found"
        }))
    ),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn child_profile(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();

    let child = sqlx::query_as::<_, Child>(&format!(
        "SELECT {} FROM children WHERE id = ?",
        CHILD_COLUMNS
    ))
    .bind(child_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Child not found"))?;

    let parent = sqlx::query_as::<_, Parent>(
        "SELECT id, name, email, phone, address FROM parents WHERE id = ?",
    )
    .bind(child.parent_id)
    .fetch_one(pool.get_ref())
    .await?;

    let center_name = match child.center_id {
        Some(id) => sqlx::query_scalar::<_, String>("SELECT name FROM centers WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await?,
        None => None,
    }
    .unwrap_or_else(|| "No center assigned".to_string());

    let date = today();
    let today_rows = child_day_rows(pool.get_ref(), child_id, date).await?;
    let today_summary = DailyAttendance::new(&today_rows).summary(date);

    let recent_attendance = sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {} FROM attendance WHERE child_id = ? ORDER BY sign_in DESC, id DESC LIMIT 10",
        super::attendance::ATTENDANCE_COLUMNS
    ))
    .bind(child_id)
    .fetch_all(pool.get_ref())
    .await?;

    let profile_picture = child.picture_url(&config.default_profile_picture).to_string();

    Ok(HttpResponse::Ok().json(ChildProfile {
        child,
        parent,
        center_name,
        profile_picture,
        today: today_summary,
        recent_attendance,
    }))
}

#[utoipa::path(
    put,
    path = "/api/children/{child_id}",
    params(("child_id", Path, description = "Child ID")),
    request_body = UpdateChild,
    responses(
        (status = 200, description = "Child updated"),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Child not found")
    ),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn update_child(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();

    if let Some(gender) = body.get("gender") {
        validate_gender(gender.as_str().unwrap_or_default())?;
    }
    if let Some(parent_id) = body.get("parent_id") {
        let parent_id = parent_id
            .as_u64()
            .ok_or_else(|| AppError::bad_request("parent_id must be a number"))?;
        if !parent_exists(pool.get_ref(), parent_id).await? {
            return Err(AppError::bad_request("Parent does not exist"));
        }
    }
    ensure_center_exists(pool.get_ref(), referenced_id(&body, "center_id")?).await?;

    let update = build_update_sql(&CHILDREN, &body, child_id)?;
    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            return AppError::bad_request("Parent or center does not exist");
        }
        error!(error = %e, child_id, "Failed to update child");
        AppError::Internal
    })?;

    if affected == 0 {
        return Err(AppError::not_found("Child not found"));
    }

    info!(child_id, user_id = auth.user_id, "Child updated");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Child updated successfully"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/children/{child_id}",
    params(("child_id", Path, description = "Child ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Child not found")
    ),
    tag = "Child",
    security(("bearer_auth" = []))
)]
pub async fn delete_child(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let child_id = path.into_inner();

    let res = sqlx::query("DELETE FROM children WHERE id = ?")
        .bind(child_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, child_id, "Failed to delete child");
            AppError::Internal
        })?;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Child not found"));
    }

    info!(child_id, user_id = auth.user_id, "Child deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::models::TokenSubject;
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn listing(id: u64, name: &str, picture: Option<&str>) -> ChildListing {
        ChildListing {
            id,
            name: name.to_string(),
            parent_id: 1,
            parent_name: "Sarah Smith".to_string(),
            center_id: None,
            center_name: None,
            profile_picture: picture.map(String::from),
        }
    }

    #[test]
    fn search_hits_carry_status_and_picture() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let rows = vec![Attendance {
            id: 1,
            child_id: 2,
            parent_id: 1,
            center_id: None,
            sign_in: day.and_hms_opt(8, 0, 0).unwrap(),
            sign_out: None,
            notes: None,
            late: false,
            late_reason: None,
        }];

        let hits = search_hits(
            vec![listing(1, "Ava", None), listing(2, "Ben", Some("/media/ben.png"))],
            &rows,
            "/static/default.png",
        );

        assert_eq!(hits[0].attendance_status, AttendanceStatus::NotSignedIn);
        assert_eq!(hits[0].profile_picture, "/static/default.png");
        assert_eq!(hits[0].center_name, "No center assigned");
        assert_eq!(hits[1].attendance_status, AttendanceStatus::SignedIn);
        assert_eq!(hits[1].profile_picture, "/media/ben.png");
    }

    #[test]
    fn gender_must_be_known() {
        assert!(validate_gender("Male").is_ok());
        assert!(matches!(validate_gender("robot"), Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn empty_search_returns_empty_list_without_db() {
        let pool = MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap();
        let subject = TokenSubject {
            user_id: 3,
            username: "ms.amy".into(),
            role: 2,
            teacher_id: Some(1),
            center_id: None,
        };
        let token = generate_access_token(&subject, &Config::for_tests().jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(pool))
                .route("/children/search", web::get().to(search_children)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/children/search?q=%20")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn update_rejects_non_numeric_center_before_touching_db() {
        let pool = MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap();
        let subject = TokenSubject {
            user_id: 3,
            username: "ms.amy".into(),
            role: 2,
            teacher_id: Some(1),
            center_id: None,
        };
        let token = generate_access_token(&subject, &Config::for_tests().jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(pool))
                .route("/children/{id}", web::put().to(update_child)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/children/4")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"name": "Mia", "center_id": [2]}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "center_id must be a number");
    }
}
