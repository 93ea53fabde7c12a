use crate::{
    auth::auth::AuthUser,
    config::Config,
    db::{day_bounds, range_bounds},
    error::AppError,
    model::{
        attendance::{Attendance, AttendanceAction, AttendanceStatus, DailyAttendance, DaySummary},
        center::Center,
        child::ChildListing,
        notification::NotificationKind,
    },
    utils::{
        center_cache,
        db_utils::Page,
        mailer::{AttendanceEmail, Mailer},
        period::{local_now, today},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, MySql, MySqlConnection, MySqlPool};
use std::collections::HashMap;
use tracing::{error, info, warn};
use utoipa::ToSchema;

pub const ATTENDANCE_COLUMNS: &str =
    "id, child_id, parent_id, center_id, sign_in, sign_out, notes, late, late_reason";

/// Children joined with parent and center names, for list views.
pub const CHILD_LISTING_SQL: &str = r#"
    SELECT c.id, c.name, c.parent_id, p.name AS parent_name,
           c.center_id, ce.name AS center_name, c.profile_picture
    FROM children c
    JOIN parents p ON p.id = c.parent_id
    LEFT JOIN centers ce ON ce.id = c.center_id
"#;

const EMAIL_WARNING: &str =
    "Failed to send notification email. Please check the email configuration.";

#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    #[schema(example = 12)]
    pub child_id: u64,
    #[schema(example = "Dropped off by grandma")]
    pub notes: Option<String>,
    /// Recorded only when the sign-in is late
    #[schema(example = "Doctor appointment")]
    pub late_reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SignOutRequest {
    #[schema(example = 12)]
    pub child_id: u64,
    #[schema(example = "Picked up by dad")]
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceActionResponse {
    #[schema(example = "Mia Jones has been signed in.")]
    pub message: String,
    pub attendance: Attendance,
    pub status: AttendanceStatus,
    pub email_sent: bool,
    /// Set when the parent email could not be sent
    pub warning: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChildStatusResponse {
    pub child_id: u64,
    pub name: String,
    pub status: AttendanceStatus,
    pub can_sign_in: bool,
    pub can_sign_out: bool,
    pub today: DaySummary,
}

/// One line of the daily records view.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChildDayRecord {
    pub id: u64,
    pub name: String,
    pub parent: String,
    pub center: String,
    pub status: AttendanceStatus,
    pub last_action: Option<AttendanceAction>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sign_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sign_out_time: Option<NaiveDateTime>,
    pub late: bool,
}

#[derive(Serialize, ToSchema)]
pub struct RecordsResponse {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub children: Vec<ChildDayRecord>,
}

#[derive(Deserialize)]
pub struct RecordsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct AttendanceQuery {
    pub child_id: Option<u64>,
    pub center_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<Attendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// The child being signed in or out, with where its email goes.
#[derive(Debug, sqlx::FromRow)]
struct ChildContact {
    id: u64,
    name: String,
    parent_id: u64,
    center_id: Option<u64>,
    parent_email: String,
}

/// Locks the child row until the transaction ends, so concurrent sign-ins
/// for the same child run one after another.
async fn lock_child(
    conn: &mut MySqlConnection,
    child_id: u64,
) -> Result<Option<ChildContact>, sqlx::Error> {
    sqlx::query_as::<_, ChildContact>(
        r#"
        SELECT c.id, c.name, c.parent_id, c.center_id, p.email AS parent_email
        FROM children c
        JOIN parents p ON p.id = c.parent_id
        WHERE c.id = ?
        FOR UPDATE
        "#,
    )
    .bind(child_id)
    .fetch_optional(conn)
    .await
}

pub async fn child_day_rows<'e, E>(
    exec: E,
    child_id: u64,
    date: NaiveDate,
) -> Result<Vec<Attendance>, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let (start, end) = day_bounds(date);
    sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {} FROM attendance WHERE child_id = ? AND sign_in >= ? AND sign_in < ? ORDER BY sign_in, id",
        ATTENDANCE_COLUMNS
    ))
    .bind(child_id)
    .bind(start)
    .bind(end)
    .fetch_all(exec)
    .await
}

/// Every attendance row signed in between `from` and `to`, optionally for one center.
pub async fn rows_between(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
    center_id: Option<u64>,
) -> Result<Vec<Attendance>, sqlx::Error> {
    let (start, end) = range_bounds(from, to);
    let center_filter = if center_id.is_some() { " AND center_id = ?" } else { "" };
    let sql = format!(
        "SELECT {} FROM attendance WHERE sign_in >= ? AND sign_in < ?{} ORDER BY child_id, sign_in, id",
        ATTENDANCE_COLUMNS, center_filter
    );

    let mut q = sqlx::query_as::<_, Attendance>(&sql).bind(start).bind(end);
    if let Some(id) = center_id {
        q = q.bind(id);
    }
    q.fetch_all(pool).await
}

pub fn group_by_child(rows: &[Attendance]) -> HashMap<u64, Vec<&Attendance>> {
    let mut map: HashMap<u64, Vec<&Attendance>> = HashMap::new();
    for row in rows {
        map.entry(row.child_id).or_default().push(row);
    }
    map
}

/// Today's status for each child id that has rows; absent ids are Not Signed In.
pub fn status_for(grouped: &HashMap<u64, Vec<&Attendance>>, child_id: u64) -> AttendanceStatus {
    grouped
        .get(&child_id)
        .map(|rows| DailyAttendance::new(rows.iter().copied()).status())
        .unwrap_or(AttendanceStatus::NotSignedIn)
}

pub fn build_records(
    children: &[ChildListing],
    rows: &[Attendance],
    date: NaiveDate,
) -> Vec<ChildDayRecord> {
    let grouped = group_by_child(rows);

    children
        .iter()
        .map(|child| {
            let day = DailyAttendance::new(
                grouped.get(&child.id).into_iter().flatten().copied(),
            );
            let summary = day.summary(date);
            ChildDayRecord {
                id: child.id,
                name: child.name.clone(),
                parent: child.parent_name.clone(),
                center: child.center_label().to_string(),
                status: summary.status,
                last_action: summary.last_action,
                sign_in_time: summary.sign_in_time,
                sign_out_time: summary.sign_out_time,
                late: summary.late,
            }
        })
        .collect()
}

fn clean(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Sign-out notes are appended to whatever was written at sign-in.
pub fn merge_notes(existing: Option<&str>, added: Option<&str>) -> Option<String> {
    let existing = existing.map(str::trim).filter(|t| !t.is_empty());
    let added = added.map(str::trim).filter(|t| !t.is_empty());
    match (existing, added) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

/// Decides a sign-in against the child's day so far. Returns whether the
/// arrival is late; only the first arrival of the day can be.
pub fn check_sign_in(
    day: &DailyAttendance,
    child_name: &str,
    center: Option<&Center>,
    now: NaiveDateTime,
    grace_minutes: i64,
) -> Result<bool, AppError> {
    if !day.status().can_sign_in() {
        return Err(AppError::bad_request(format!(
            "{} is already signed in today.",
            child_name
        )));
    }
    Ok(day.is_empty() && center.is_some_and(|c| c.is_late(now, grace_minutes)))
}

/// The visit a sign-out closes.
pub fn check_sign_out<'a>(
    day: &DailyAttendance<'a>,
    child_name: &str,
) -> Result<&'a Attendance, AppError> {
    day.open_visit().ok_or_else(|| {
        AppError::bad_request(format!(
            "{} cannot be signed out: no open sign-in today.",
            child_name
        ))
    })
}

async fn notify_parent(mailer: &Mailer, email: AttendanceEmail) -> (bool, Option<String>) {
    match mailer.send_attendance(&email).await {
        Ok(()) => (mailer.is_enabled(), None),
        Err(e) => {
            error!(error = %e, to = %email.parent_email, child = %email.child_name, "Email sending failed");
            (false, Some(EMAIL_WARNING.to_string()))
        }
    }
}

/// Sign a child in
#[utoipa::path(
    post,
    path = "/api/attendance/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AttendanceActionResponse),
        (status = 400, description = "Already signed in today", body = Object, example = json!({
            "message": "Mia Jones is already signed in today."
        })),
        (status = 404, description = "Child not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn sign_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
    payload: web::Json<SignInRequest>,
) -> Result<HttpResponse, AppError> {
    let now = local_now();
    let mut tx = pool.begin().await?;

    let child = lock_child(&mut tx, payload.child_id)
        .await?
        .ok_or_else(|| AppError::not_found("Child not found"))?;

    let rows = child_day_rows(&mut *tx, child.id, now.date()).await?;
    let day = DailyAttendance::new(&rows);
    let center = match child.center_id {
        Some(id) => center_cache::get(pool.get_ref(), id).await?,
        None => None,
    };
    let late = check_sign_in(
        &day,
        &child.name,
        center.as_ref(),
        now,
        config.late_grace_minutes,
    )
    .inspect_err(|_| info!(child_id = child.id, "Duplicate sign-in rejected"))?;
    let late_reason = match (&center, late) {
        (Some(c), true) => clean(&payload.late_reason).or_else(|| Some(c.late_reason(now))),
        _ => None,
    };
    let notes = clean(&payload.notes);

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (child_id, parent_id, center_id, sign_in, notes, late, late_reason)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(child.id)
    .bind(child.parent_id)
    .bind(child.center_id)
    .bind(now)
    .bind(&notes)
    .bind(late)
    .bind(&late_reason)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, child_id = child.id, "Sign-in insert failed");
        AppError::Internal
    })?;

    if late {
        let kind = NotificationKind::LateSignIn;
        sqlx::query(
            r#"
            INSERT INTO notifications (child_id, center_id, kind, title, message)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(child.id)
        .bind(child.center_id)
        .bind(kind.as_ref())
        .bind(kind.title())
        .bind(format!(
            "Late sign-in for {} at {}",
            child.name,
            now.format("%H:%M")
        ))
        .execute(&mut *tx)
        .await?;
        warn!(child_id = child.id, "Late sign-in recorded");
    }

    tx.commit().await?;

    let attendance = Attendance {
        id: result.last_insert_id(),
        child_id: child.id,
        parent_id: child.parent_id,
        center_id: child.center_id,
        sign_in: now,
        sign_out: None,
        notes: notes.clone(),
        late,
        late_reason,
    };
    info!(
        child_id = child.id,
        attendance_id = attendance.id,
        user_id = auth.user_id,
        late,
        "Child signed in"
    );

    let (email_sent, warning) = notify_parent(
        &mailer,
        AttendanceEmail {
            child_name: child.name.clone(),
            parent_email: child.parent_email.clone(),
            action: "Signed In",
            timestamp: now,
            late,
            notes,
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(AttendanceActionResponse {
        message: format!("{} has been signed in.", child.name),
        attendance,
        status: AttendanceStatus::SignedIn,
        email_sent,
        warning,
    }))
}

/// Sign a child out
#[utoipa::path(
    post,
    path = "/api/attendance/sign-out",
    request_body = SignOutRequest,
    responses(
        (status = 200, description = "Signed out", body = AttendanceActionResponse),
        (status = 400, description = "No open sign-in today", body = Object, example = json!({
            "message": "Mia Jones cannot be signed out: no open sign-in today."
        })),
        (status = 404, description = "Child not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn sign_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    payload: web::Json<SignOutRequest>,
) -> Result<HttpResponse, AppError> {
    let now = local_now();
    let mut tx = pool.begin().await?;

    let child = lock_child(&mut tx, payload.child_id)
        .await?
        .ok_or_else(|| AppError::not_found("Child not found"))?;

    let rows = child_day_rows(&mut *tx, child.id, now.date()).await?;
    let day = DailyAttendance::new(&rows);
    let open = check_sign_out(&day, &child.name)?;

    let notes = merge_notes(open.notes.as_deref(), payload.notes.as_deref());

    sqlx::query(
        r#"
        UPDATE attendance
        SET sign_out = ?, notes = ?, updated_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(&notes)
    .bind(open.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, child_id = child.id, attendance_id = open.id, "Sign-out update failed");
        AppError::Internal
    })?;

    let attendance = Attendance {
        sign_out: Some(now),
        notes: notes.clone(),
        ..open.clone()
    };

    tx.commit().await?;

    info!(
        child_id = child.id,
        attendance_id = attendance.id,
        user_id = auth.user_id,
        "Child signed out"
    );

    let (email_sent, warning) = notify_parent(
        &mailer,
        AttendanceEmail {
            child_name: child.name.clone(),
            parent_email: child.parent_email.clone(),
            action: "Signed Out",
            timestamp: now,
            late: false,
            notes: clean(&payload.notes),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(AttendanceActionResponse {
        message: format!("{} has been signed out.", child.name),
        attendance,
        status: AttendanceStatus::SignedOut,
        email_sent,
        warning,
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/status/{child_id}",
    params(("child_id", Path, description = "Child ID")),
    responses(
        (status = 200, description = "Today's status", body = ChildStatusResponse),
        (status = 404, description = "Child not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn child_status(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();
    let date = today();

    let name = sqlx::query_scalar::<_, String>("SELECT name FROM children WHERE id = ?")
        .bind(child_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Child not found"))?;

    let rows = child_day_rows(pool.get_ref(), child_id, date).await?;
    let day = DailyAttendance::new(&rows);
    let status = day.status();

    Ok(HttpResponse::Ok().json(ChildStatusResponse {
        child_id,
        name,
        status,
        can_sign_in: status.can_sign_in(),
        can_sign_out: status.can_sign_out(),
        today: day.summary(date),
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/records",
    params(("date", Query, description = "Day to show (YYYY-MM-DD), default today")),
    responses((status = 200, description = "Every child's status for the day", body = RecordsResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_records(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, AppError> {
    let date = query.date.unwrap_or_else(today);

    let children = sqlx::query_as::<_, ChildListing>(&format!("{} ORDER BY c.name", CHILD_LISTING_SQL))
        .fetch_all(pool.get_ref())
        .await?;
    let rows = rows_between(pool.get_ref(), date, date, None).await?;

    Ok(HttpResponse::Ok().json(RecordsResponse {
        date,
        children: build_records(&children, &rows, date),
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(
        ("child_id", Query, description = "Filter by child"),
        ("center_id", Query, description = "Filter by center"),
        ("from", Query, description = "First day (YYYY-MM-DD)"),
        ("to", Query, description = "Last day (YYYY-MM-DD)"),
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page")
    ),
    responses((status = 200, description = "Paginated attendance rows", body = AttendanceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::new(query.page, query.per_page, 20);

    let mut conditions: Vec<&str> = Vec::new();
    let mut ids: Vec<u64> = Vec::new();
    let mut times: Vec<NaiveDateTime> = Vec::new();

    if let Some(child_id) = query.child_id {
        conditions.push("child_id = ?");
        ids.push(child_id);
    }
    if let Some(center_id) = query.center_id {
        conditions.push("center_id = ?");
        ids.push(center_id);
    }
    if let Some(from) = query.from {
        conditions.push("sign_in >= ?");
        times.push(day_bounds(from).0);
    }
    if let Some(to) = query.to {
        conditions.push("sign_in < ?");
        times.push(day_bounds(to).1);
    }
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::bad_request("from cannot be after to"));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM attendance {}", where_clause);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for id in &ids {
        count_q = count_q.bind(*id);
    }
    for t in &times {
        count_q = count_q.bind(*t);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {} FROM attendance {} ORDER BY sign_in DESC, id DESC LIMIT ? OFFSET ?",
        ATTENDANCE_COLUMNS, where_clause
    );
    let mut data_q = sqlx::query_as::<_, Attendance>(&data_sql);
    for id in &ids {
        data_q = data_q.bind(*id);
    }
    for t in &times {
        data_q = data_q.bind(*t);
    }
    let data = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn listing(id: u64, name: &str, center: Option<&str>) -> ChildListing {
        ChildListing {
            id,
            name: name.to_string(),
            parent_id: 100 + id,
            parent_name: format!("Parent of {name}"),
            center_id: center.map(|_| 1),
            center_name: center.map(String::from),
            profile_picture: None,
        }
    }

    fn row(id: u64, child_id: u64, h_in: u32, h_out: Option<u32>) -> Attendance {
        Attendance {
            id,
            child_id,
            parent_id: 100 + child_id,
            center_id: Some(1),
            sign_in: d().and_hms_opt(h_in, 0, 0).unwrap(),
            sign_out: h_out.and_then(|h| d().and_hms_opt(h, 0, 0)),
            notes: None,
            late: h_in >= 9,
            late_reason: None,
        }
    }

    fn sunshine() -> Center {
        Center {
            id: 1,
            name: "Sunshine".into(),
            address: "1 Road".into(),
            phone: "000".into(),
            email: "c@x.com".into(),
            capacity: 20,
            opening_time: crate::model::center::default_opening_time(),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        d().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn second_sign_in_is_rejected_with_the_child_name() {
        let rows = vec![row(1, 4, 8, None)];
        let day = DailyAttendance::new(&rows);
        let err = check_sign_in(&day, "Mia", Some(&sunshine()), at(9, 0), 0).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Mia is already signed in today."));
    }

    #[test]
    fn only_the_first_arrival_is_late() {
        let c = sunshine();
        let empty: Vec<Attendance> = Vec::new();
        let first = DailyAttendance::new(&empty);
        assert!(check_sign_in(&first, "Mia", Some(&c), at(9, 0), 10).unwrap());
        assert!(!check_sign_in(&first, "Mia", Some(&c), at(8, 40), 10).unwrap());
        assert!(!check_sign_in(&first, "Mia", None, at(11, 0), 0).unwrap());

        let rows = vec![row(1, 4, 8, Some(10))];
        let back_again = DailyAttendance::new(&rows);
        assert!(!check_sign_in(&back_again, "Mia", Some(&c), at(13, 0), 0).unwrap());
    }

    #[test]
    fn sign_out_needs_an_open_visit() {
        let empty: Vec<Attendance> = Vec::new();
        let err = check_sign_out(&DailyAttendance::new(&empty), "Mia").unwrap_err();
        assert!(matches!(
            err,
            AppError::BadRequest(ref m) if m == "Mia cannot be signed out: no open sign-in today."
        ));

        let closed = vec![row(1, 4, 8, Some(15))];
        assert!(check_sign_out(&DailyAttendance::new(&closed), "Mia").is_err());

        let open = vec![row(1, 4, 8, Some(10)), row(2, 4, 13, None)];
        assert_eq!(check_sign_out(&DailyAttendance::new(&open), "Mia").unwrap().id, 2);
    }

    #[test]
    fn records_cover_every_child() {
        let children = vec![
            listing(1, "Ava", Some("Sunshine")),
            listing(2, "Ben", None),
            listing(3, "Cal", Some("Sunshine")),
        ];
        let rows = vec![row(10, 1, 8, Some(15)), row(11, 3, 9, None)];

        let records = build_records(&children, &rows, d());
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].status, AttendanceStatus::SignedOut);
        assert_eq!(records[0].last_action, Some(AttendanceAction::SignOut));
        assert!(records[0].sign_out_time.is_some());

        assert_eq!(records[1].status, AttendanceStatus::NotSignedIn);
        assert_eq!(records[1].center, "No center assigned");
        assert_eq!(records[1].last_action, None);

        assert_eq!(records[2].status, AttendanceStatus::SignedIn);
        assert!(records[2].late);
        assert_eq!(records[2].sign_out_time, None);
    }

    #[test]
    fn status_for_unknown_child_is_not_signed_in() {
        let rows = vec![row(10, 1, 8, None)];
        let grouped = group_by_child(&rows);
        assert_eq!(status_for(&grouped, 1), AttendanceStatus::SignedIn);
        assert_eq!(status_for(&grouped, 2), AttendanceStatus::NotSignedIn);
    }

    #[test]
    fn sign_out_notes_are_appended() {
        assert_eq!(
            merge_notes(Some("dropped by gran"), Some("picked by dad")).as_deref(),
            Some("dropped by gran; picked by dad")
        );
        assert_eq!(merge_notes(None, Some(" x ")).as_deref(), Some("x"));
        assert_eq!(merge_notes(Some("a"), Some("  ")).as_deref(), Some("a"));
        assert_eq!(merge_notes(None, None), None);
    }

    #[test]
    fn blank_notes_are_dropped() {
        assert_eq!(clean(&Some("   ".into())), None);
        assert_eq!(clean(&Some(" hi ".into())).as_deref(), Some("hi"));
    }
}
