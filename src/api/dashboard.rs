use crate::{
    api::attendance::{CHILD_LISTING_SQL, group_by_child, rows_between},
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        attendance::{Attendance, AttendanceStatus, DailyAttendance},
        child::{ChildListing, picture_or_default},
        notification::Notification,
    },
    utils::period::{local_now, today},
};
use actix_web::{HttpResponse, web};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use super::notification::NOTIFICATION_COLUMNS;

const RECENT_NOTIFICATIONS: i64 = 5;
const NOTIFICATION_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedInChild {
    pub id: u64,
    pub name: String,
    pub parent_name: String,
    pub center_name: String,
    pub profile_picture: String,
    #[schema(value_type = String, format = "date-time")]
    pub sign_in_time: NaiveDateTime,
    pub late: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_children: usize,
    pub signed_in_count: usize,
    pub not_signed_in_count: usize,
    pub late_today: usize,
    pub signed_in_children: Vec<SignedInChild>,
    pub recent_notifications: Vec<Notification>,
}

/// Today's counters from the child list and today's rows.
///
/// Children who came and left count as neither signed in nor not signed in.
pub fn build_dashboard(
    children: &[ChildListing],
    rows: &[Attendance],
    default_picture: &str,
    recent_notifications: Vec<Notification>,
) -> Dashboard {
    let grouped = group_by_child(rows);

    let mut signed_in_children = Vec::new();
    let mut not_signed_in_count = 0;
    let mut late_today = 0;

    for child in children {
        let day = DailyAttendance::new(grouped.get(&child.id).into_iter().flatten().copied());
        if day.late() {
            late_today += 1;
        }
        match day.status() {
            AttendanceStatus::NotSignedIn => not_signed_in_count += 1,
            AttendanceStatus::SignedIn => {
                if let Some(sign_in_time) = day.current_sign_in() {
                    signed_in_children.push(SignedInChild {
                        id: child.id,
                        name: child.name.clone(),
                        parent_name: child.parent_name.clone(),
                        center_name: child.center_label().to_string(),
                        profile_picture: picture_or_default(
                            child.profile_picture.as_deref(),
                            default_picture,
                        )
                        .to_string(),
                        sign_in_time,
                        late: day.late(),
                    });
                }
            }
            AttendanceStatus::SignedOut => {}
        }
    }

    signed_in_children.sort_by_key(|c| c.sign_in_time);

    Dashboard {
        total_children: children.len(),
        signed_in_count: signed_in_children.len(),
        not_signed_in_count,
        late_today,
        signed_in_children,
        recent_notifications,
    }
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Today's overview", body = Dashboard)),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let date = today();

    let children = sqlx::query_as::<_, ChildListing>(&format!("{} ORDER BY c.name", CHILD_LISTING_SQL))
        .fetch_all(pool.get_ref())
        .await?;
    let rows = rows_between(pool.get_ref(), date, date, None).await?;

    let since = local_now() - Duration::days(NOTIFICATION_WINDOW_DAYS);
    let notifications = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE created_at >= ? ORDER BY created_at DESC, id DESC LIMIT ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(since)
    .bind(RECENT_NOTIFICATIONS)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(build_dashboard(
        &children,
        &rows,
        &config.default_profile_picture,
        notifications,
    )))
}
