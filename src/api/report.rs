use crate::{
    api::{
        attendance::{ATTENDANCE_COLUMNS, CHILD_LISTING_SQL, rows_between},
        child::CHILD_COLUMNS,
    },
    auth::auth::AuthUser,
    config::Config,
    db::{day_bounds, range_bounds},
    error::AppError,
    model::{
        attendance::{Attendance, DaySummary, summarize_by_child_and_day},
        center::Center,
        child::{Child, ChildListing},
    },
    utils::{
        center_cache,
        export::{PdfReport, ReportRow, attendance_csv},
        period::{local_now, month_to_date, resolve_range, today, week_of},
    },
};
use actix_web::{HttpResponse, http::header, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{error, info};
use utoipa::ToSchema;

const TOP_CHILDREN: i64 = 5;
const CHILD_REPORT_DAYS: i64 = 30;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ActiveChild {
    pub id: u64,
    pub name: String,
    pub visits: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChildDayRow {
    pub child_id: u64,
    pub name: String,
    pub parent: String,
    pub center: String,
    pub summary: DaySummary,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryReport {
    pub total_children: i64,
    pub total_parents: i64,
    pub signed_in_today: i64,
    pub signed_out_today: i64,
    pub week_sign_ins: i64,
    pub month_sign_ins: i64,
    pub most_active: Vec<ActiveChild>,
    pub today: Vec<ChildDayRow>,
}

#[derive(Serialize, ToSchema)]
pub struct ChildReport {
    pub child: Child,
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub days_attended: usize,
    pub late_days: usize,
    pub days: Vec<DaySummary>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub date: Option<NaiveDate>,
    pub center_id: Option<u64>,
}

/// Day summaries joined with the child's names. Rows for children that no
/// longer exist are skipped.
pub fn day_rows(
    children: &HashMap<u64, ChildListing>,
    summaries: Vec<(u64, DaySummary)>,
) -> Vec<ChildDayRow> {
    let mut out: Vec<ChildDayRow> = summaries
        .into_iter()
        .filter_map(|(child_id, summary)| {
            children.get(&child_id).map(|c| ChildDayRow {
                child_id,
                name: c.name.clone(),
                parent: c.parent_name.clone(),
                center: c.center_label().to_string(),
                summary,
            })
        })
        .collect();
    out.sort_by(|a, b| (a.summary.date, &a.name).cmp(&(b.summary.date, &b.name)));
    out
}

pub fn export_rows(rows: Vec<ChildDayRow>) -> Vec<ReportRow> {
    rows.into_iter()
        .map(|r| ReportRow {
            child_name: r.name,
            parent_name: r.parent,
            center_name: r.center,
            date: r.summary.date,
            sign_in: r.summary.sign_in_time,
            sign_out: r.summary.sign_out_time,
            status: r.summary.status,
            late: r.summary.late,
            notes: r.summary.notes,
        })
        .collect()
}

async fn child_listings(pool: &MySqlPool) -> Result<HashMap<u64, ChildListing>, sqlx::Error> {
    let children = sqlx::query_as::<_, ChildListing>(CHILD_LISTING_SQL)
        .fetch_all(pool)
        .await?;
    Ok(children.into_iter().map(|c| (c.id, c)).collect())
}

async fn count_sign_ins(pool: &MySqlPool, from: NaiveDate, to: NaiveDate) -> Result<i64, sqlx::Error> {
    let (start, end) = range_bounds(from, to);
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE sign_in >= ? AND sign_in < ?")
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
}

/// A center filter must name an existing center.
fn require_center(center_id: Option<u64>, found: Option<Center>) -> Result<Option<Center>, AppError> {
    match (center_id, found) {
        (Some(_), None) => Err(AppError::not_found("Center not found")),
        (_, found) => Ok(found),
    }
}

/// PDF title and center line: the center's name, or the configured title for all centers.
fn pdf_heading<'a>(center: Option<&'a Center>, report_title: &'a str) -> (&'a str, &'a str) {
    match center {
        Some(c) => (c.name.as_str(), c.name.as_str()),
        None => (report_title, "All Centers"),
    }
}

struct ExportData {
    date: NaiveDate,
    center: Option<Center>,
    rows: Vec<ReportRow>,
}

async fn export_data(pool: &MySqlPool, query: &ExportQuery) -> Result<ExportData, AppError> {
    let found = match query.center_id {
        Some(id) => center_cache::get(pool, id).await?,
        None => None,
    };
    let center = require_center(query.center_id, found)?;

    let date = query.date.unwrap_or_else(today);
    let children = child_listings(pool).await?;
    let rows = rows_between(pool, date, date, query.center_id).await?;
    let rows = export_rows(day_rows(&children, summarize_by_child_and_day(&rows)));
    Ok(ExportData { date, center, rows })
}

fn attachment(filename: &str) -> (header::HeaderName, String) {
    (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", filename),
    )
}

#[utoipa::path(
    get,
    path = "/api/reports/summary",
    responses(
        (status = 200, description = "Attendance totals", body = SummaryReport),
        (status = 403, description = "Admin only")
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let pool = pool.get_ref();
    let date = today();
    let (day_start, day_end) = day_bounds(date);

    let total_children = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM children")
        .fetch_one(pool)
        .await?;
    let total_parents = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM parents")
        .fetch_one(pool)
        .await?;

    let signed_in_today = count_sign_ins(pool, date, date).await?;
    let signed_out_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE sign_out >= ? AND sign_out < ?",
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_one(pool)
    .await?;

    let (week_start, week_end) = week_of(date);
    let week_sign_ins = count_sign_ins(pool, week_start, week_end).await?;
    let (month_start, month_end) = month_to_date(date);
    let month_sign_ins = count_sign_ins(pool, month_start, month_end).await?;

    let most_active = sqlx::query_as::<_, ActiveChild>(
        r#"
        SELECT c.id, c.name, COUNT(a.id) AS visits
        FROM attendance a
        JOIN children c ON c.id = a.child_id
        GROUP BY c.id, c.name
        ORDER BY visits DESC, c.name
        LIMIT ?
        "#,
    )
    .bind(TOP_CHILDREN)
    .fetch_all(pool)
    .await?;

    let children = child_listings(pool).await?;
    let rows = rows_between(pool, date, date, None).await?;

    Ok(HttpResponse::Ok().json(SummaryReport {
        total_children,
        total_parents,
        signed_in_today,
        signed_out_today,
        week_sign_ins,
        month_sign_ins,
        most_active,
        today: day_rows(&children, summarize_by_child_and_day(&rows)),
    }))
}

#[utoipa::path(
    get,
    path = "/api/reports/children/{child_id}",
    params(
        ("child_id", Path, description = "Child ID"),
        ("from", Query, description = "First day (YYYY-MM-DD), default 30 days ago"),
        ("to", Query, description = "Last day (YYYY-MM-DD), default today")
    ),
    responses(
        (status = 200, description = "Per-day attendance for one child", body = ChildReport),
        (status = 400, description = "Invalid range"),
        (status = 404, description = "Child not found")
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn child_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let child_id = path.into_inner();
    let (from, to) = resolve_range(query.from, query.to, today(), CHILD_REPORT_DAYS)
        .map_err(|e| AppError::bad_request(e))?;

    let child = sqlx::query_as::<_, Child>(&format!(
        "SELECT {} FROM children WHERE id = ?",
        CHILD_COLUMNS
    ))
    .bind(child_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Child not found"))?;

    let (start, end) = range_bounds(from, to);
    let rows = sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {} FROM attendance WHERE child_id = ? AND sign_in >= ? AND sign_in < ? ORDER BY sign_in, id",
        ATTENDANCE_COLUMNS
    ))
    .bind(child_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool.get_ref())
    .await?;

    let days: Vec<DaySummary> = summarize_by_child_and_day(&rows)
        .into_iter()
        .map(|(_, summary)| summary)
        .collect();

    Ok(HttpResponse::Ok().json(ChildReport {
        child,
        from,
        to,
        days_attended: days.len(),
        late_days: days.iter().filter(|d| d.late).count(),
        days,
    }))
}

#[utoipa::path(
    get,
    path = "/api/reports/attendance.csv",
    params(
        ("date", Query, description = "Report day (YYYY-MM-DD), default today"),
        ("center_id", Query, description = "Only this center")
    ),
    responses(
        (status = 200, description = "CSV file", body = String, content_type = "text/csv"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Center not found")
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn export_csv(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let ExportData { date, rows, .. } = export_data(pool.get_ref(), &query).await?;

    let body = attendance_csv(&rows).map_err(|e| {
        error!(error = %e, %date, "CSV export failed");
        AppError::Internal
    })?;

    info!(%date, rows = rows.len(), user_id = auth.user_id, "CSV report exported");
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(attachment(&format!("attendance_{}.csv", date.format("%Y%m%d"))))
        .body(body))
}

#[utoipa::path(
    get,
    path = "/api/reports/attendance.pdf",
    params(
        ("date", Query, description = "Report day (YYYY-MM-DD), default today"),
        ("center_id", Query, description = "Only this center")
    ),
    responses(
        (status = 200, description = "PDF file", body = String, content_type = "application/pdf"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Center not found")
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn export_pdf(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let ExportData { date, center, rows } = export_data(pool.get_ref(), &query).await?;
    let (title, center_label) = pdf_heading(center.as_ref(), &config.report_title);

    let body = PdfReport {
        title,
        center_label,
        report_date: date,
        rows: &rows,
    }
    .render()
    .map_err(|e| {
        error!(error = %e, %date, "PDF export failed");
        AppError::Internal
    })?;

    let filename = format!(
        "attendance_report_{}.pdf",
        local_now().format("%Y%m%d_%H%M%S")
    );
    info!(%date, rows = rows.len(), user_id = auth.user_id, "PDF report exported");
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(attachment(&filename))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn listing(id: u64, name: &str) -> ChildListing {
        ChildListing {
            id,
            name: name.to_string(),
            parent_id: id,
            parent_name: format!("{name}'s mum"),
            center_id: None,
            center_name: None,
            profile_picture: None,
        }
    }

    fn att(id: u64, child_id: u64, day: u32, h: u32, out: Option<u32>) -> Attendance {
        let d = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        Attendance {
            id,
            child_id,
            parent_id: child_id,
            center_id: None,
            sign_in: d.and_hms_opt(h, 0, 0).unwrap(),
            sign_out: out.and_then(|o| d.and_hms_opt(o, 0, 0)),
            notes: Some("ok".into()),
            late: false,
            late_reason: None,
        }
    }

    #[test]
    fn export_rows_are_sorted_and_skip_unknown_children() {
        let children: HashMap<u64, ChildListing> = [listing(1, "Zoe"), listing(2, "Ava")]
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let rows = vec![
            att(1, 1, 2, 8, Some(15)),
            att(2, 2, 2, 9, None),
            att(3, 99, 2, 9, None),
        ];

        let report = export_rows(day_rows(&children, summarize_by_child_and_day(&rows)));
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].child_name, "Ava");
        assert_eq!(report[0].status, AttendanceStatus::SignedIn);
        assert_eq!(report[0].sign_out, None);
        assert_eq!(report[1].child_name, "Zoe");
        assert_eq!(report[1].status, AttendanceStatus::SignedOut);
        assert_eq!(report[1].center_name, "No center assigned");
        assert_eq!(report[1].parent_name, "Zoe's mum");
    }

    fn sunshine() -> Center {
        Center {
            id: 4,
            name: "Sunshine Kids".into(),
            address: "12 Main St".into(),
            phone: "000".into(),
            email: "hello@sunshine.example".into(),
            capacity: 40,
            opening_time: crate::model::center::default_opening_time(),
        }
    }

    #[test]
    fn unknown_center_filter_is_not_found() {
        let err = require_center(Some(404), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Center not found"));

        assert!(require_center(None, None).unwrap().is_none());
        assert_eq!(require_center(Some(4), Some(sunshine())).unwrap().map(|c| c.id), Some(4));
    }

    #[test]
    fn pdf_heading_names_the_center_or_all_centers() {
        let c = sunshine();
        assert_eq!(pdf_heading(Some(&c), "Childcare Center"), ("Sunshine Kids", "Sunshine Kids"));
        assert_eq!(pdf_heading(None, "Childcare Center"), ("Childcare Center", "All Centers"));
    }

    #[test]
    fn attachment_header_quotes_filename() {
        let (name, value) = attachment("attendance_20250602.csv");
        assert_eq!(name, header::CONTENT_DISPOSITION);
        assert_eq!(value, "attachment; filename=\"attendance_20250602.csv\"");
    }
}
