use crate::{
    auth::auth::AuthUser, error::AppError, model::notification::Notification,
    utils::db_utils::Page,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

pub const NOTIFICATION_COLUMNS: &str =
    "id, child_id, center_id, kind, title, message, is_read, created_at";

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Only unread notifications
    pub unread: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct NotificationListResponse {
    pub data: Vec<Notification>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Notifications, newest first", body = NotificationListResponse)),
    tag = "Notification",
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page, 20);
    let where_clause = if query.unread.unwrap_or(false) {
        "WHERE is_read = FALSE"
    } else {
        ""
    };

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM notifications {}",
        where_clause
    ))
    .fetch_one(pool.get_ref())
    .await?;

    let data = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        NOTIFICATION_COLUMNS, where_clause
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(NotificationListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id", Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notification",
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let notification_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE id = ?")
        .bind(notification_id)
        .fetch_one(pool.get_ref())
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Notification not found"));
    }

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
        .bind(notification_id)
        .execute(pool.get_ref())
        .await?;

    info!(notification_id, user_id = auth.user_id, "Notification marked read");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Notification marked as read"
    })))
}
