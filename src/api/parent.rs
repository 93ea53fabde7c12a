use crate::{
    auth::auth::AuthUser,
    error::{AppError, is_duplicate_key},
    model::{child::Child, parent::Parent},
    utils::db_utils::{PARENTS, Page, build_update_sql, execute_update, like_pattern},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use super::child::CHILD_COLUMNS;

#[derive(Deserialize, ToSchema)]
pub struct CreateParent {
    #[schema(example = "Sarah Smith")]
    pub name: String,
    #[schema(example = "sarah@example.com", format = "email")]
    pub email: String,
    #[schema(example = "0211234567")]
    pub phone: Option<String>,
    #[schema(example = "4 Oak St")]
    pub address: Option<String>,
}

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct UpdateParent {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ParentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ParentListResponse {
    pub data: Vec<Parent>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ParentDetail {
    #[serde(flatten)]
    pub parent: Parent,
    pub children: Vec<Child>,
}

const PARENT_COLUMNS: &str = "id, name, email, phone, address";

#[utoipa::path(
    post,
    path = "/api/parents",
    request_body = CreateParent,
    responses(
        (status = 201, description = "Parent created", body = Parent),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Parent",
    security(("bearer_auth" = []))
)]
pub async fn create_parent(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateParent>,
) -> Result<HttpResponse, AppError> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::bad_request("Name and email are required"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO parents (name, email, phone, address)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            return AppError::conflict("A parent with this email already exists");
        }
        error!(error = %e, "Failed to create parent");
        AppError::Internal
    })?;

    let parent = Parent {
        id: result.last_insert_id(),
        name: name.to_string(),
        email: email.to_string(),
        phone: payload.phone.clone(),
        address: payload.address.clone(),
    };

    info!(parent_id = parent.id, user_id = auth.user_id, "Parent created");
    Ok(HttpResponse::Created().json(parent))
}

#[utoipa::path(
    get,
    path = "/api/parents",
    params(ParentQuery),
    responses((status = 200, description = "Paginated parent list", body = ParentListResponse)),
    tag = "Parent",
    security(("bearer_auth" = []))
)]
pub async fn list_parents(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ParentQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page, 20);
    let search = query.search.as_deref().map(like_pattern);

    let where_clause = if search.is_some() {
        "WHERE (name LIKE ? OR email LIKE ?)"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM parents {}", where_clause);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(s) = &search {
        count_q = count_q.bind(s).bind(s);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM parents {} ORDER BY name LIMIT ? OFFSET ?",
        PARENT_COLUMNS, where_clause
    );
    let mut data_q = sqlx::query_as::<_, Parent>(&data_sql);
    if let Some(s) = &search {
        data_q = data_q.bind(s).bind(s);
    }
    let data = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(ParentListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/parents/{parent_id}",
    params(("parent_id", Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Parent with children", body = ParentDetail),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parent",
    security(("bearer_auth" = []))
)]
pub async fn get_parent(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let parent_id = path.into_inner();

    let parent = sqlx::query_as::<_, Parent>(&format!(
        "SELECT {} FROM parents WHERE id = ?",
        PARENT_COLUMNS
    ))
    .bind(parent_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Parent not found"))?;

    let children = sqlx::query_as::<_, Child>(&format!(
        "SELECT {} FROM children WHERE parent_id = ? ORDER BY name",
        CHILD_COLUMNS
    ))
    .bind(parent_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(ParentDetail { parent, children }))
}

#[utoipa::path(
    put,
    path = "/api/parents/{parent_id}",
    params(("parent_id", Path, description = "Parent ID")),
    request_body = UpdateParent,
    responses(
        (status = 200, description = "Parent updated"),
        (status = 404, description = "Parent not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Parent",
    security(("bearer_auth" = []))
)]
pub async fn update_parent(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let parent_id = path.into_inner();

    let update = build_update_sql(&PARENTS, &body, parent_id)?;
    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            return AppError::conflict("A parent with this email already exists");
        }
        error!(error = %e, parent_id, "Failed to update parent");
        AppError::Internal
    })?;

    if affected == 0 {
        return Err(AppError::not_found("Parent not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Parent updated successfully"
    })))
}

/// Deleting a parent removes their children and attendance history.
#[utoipa::path(
    delete,
    path = "/api/parents/{parent_id}",
    params(("parent_id", Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parent",
    security(("bearer_auth" = []))
)]
pub async fn delete_parent(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let parent_id = path.into_inner();

    let res = sqlx::query("DELETE FROM parents WHERE id = ?")
        .bind(parent_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, parent_id, "Failed to delete parent");
            AppError::Internal
        })?;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Parent not found"));
    }

    info!(parent_id, user_id = auth.user_id, "Parent deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
