use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub child_id: u64,
    pub parent_id: u64,
    pub center_id: Option<u64>,
    #[schema(example = "2026-01-05T08:12:00", format = "date-time", value_type = String)]
    pub sign_in: NaiveDateTime,
    #[schema(example = "2026-01-05T16:45:00", format = "date-time", value_type = Option<String>)]
    pub sign_out: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub late: bool,
    pub late_reason: Option<String>,
}

/// A child's attendance state for one day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
pub enum AttendanceStatus {
    #[strum(serialize = "Not Signed In")]
    #[serde(rename = "Not Signed In")]
    NotSignedIn,
    #[strum(serialize = "Signed In")]
    #[serde(rename = "Signed In")]
    SignedIn,
    #[strum(serialize = "Signed Out")]
    #[serde(rename = "Signed Out")]
    SignedOut,
}

impl AttendanceStatus {
    pub fn can_sign_in(self) -> bool {
        self != AttendanceStatus::SignedIn
    }

    pub fn can_sign_out(self) -> bool {
        self == AttendanceStatus::SignedIn
    }
}

/// Last thing that happened to a child on a day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
    SignIn,
    SignOut,
}

/// Every attendance row of one child on one day, ordered by sign-in time.
///
/// This is the only place the day's state is derived: the latest row decides
/// whether the child is currently in (open row) or out (closed row).
#[derive(Debug, Clone)]
pub struct DailyAttendance<'a> {
    rows: Vec<&'a Attendance>,
}

impl<'a> DailyAttendance<'a> {
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Attendance>,
    {
        let mut rows: Vec<&Attendance> = rows.into_iter().collect();
        rows.sort_by_key(|r| (r.sign_in, r.id));
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn visits(&self) -> usize {
        self.rows.len()
    }

    pub fn status(&self) -> AttendanceStatus {
        match self.rows.last() {
            None => AttendanceStatus::NotSignedIn,
            Some(r) if r.sign_out.is_none() => AttendanceStatus::SignedIn,
            Some(_) => AttendanceStatus::SignedOut,
        }
    }

    pub fn last_action(&self) -> Option<AttendanceAction> {
        self.rows.last().map(|r| match r.sign_out {
            Some(_) => AttendanceAction::SignOut,
            None => AttendanceAction::SignIn,
        })
    }

    /// The row a sign-out would close.
    pub fn open_visit(&self) -> Option<&'a Attendance> {
        self.rows.last().copied().filter(|r| r.sign_out.is_none())
    }

    pub fn first_sign_in(&self) -> Option<NaiveDateTime> {
        self.rows.first().map(|r| r.sign_in)
    }

    /// Latest sign-out, only once the child has left.
    pub fn last_sign_out(&self) -> Option<NaiveDateTime> {
        match self.status() {
            AttendanceStatus::SignedOut => self.rows.last().and_then(|r| r.sign_out),
            _ => None,
        }
    }

    /// Current visit's sign-in while the child is in.
    pub fn current_sign_in(&self) -> Option<NaiveDateTime> {
        self.open_visit().map(|r| r.sign_in)
    }

    /// The day counts as late when the first arrival was late.
    pub fn late(&self) -> bool {
        self.rows.first().map(|r| r.late).unwrap_or(false)
    }

    /// All non-empty notes of the day, joined.
    pub fn notes(&self) -> Option<String> {
        let notes: Vec<&str> = self
            .rows
            .iter()
            .filter_map(|r| r.notes.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        }
    }

    pub fn summary(&self, date: NaiveDate) -> DaySummary {
        DaySummary {
            date,
            status: self.status(),
            last_action: self.last_action(),
            sign_in_time: self.first_sign_in(),
            sign_out_time: self.last_sign_out(),
            visits: self.visits(),
            late: self.late(),
            notes: self.notes(),
        }
    }
}

/// Serializable view of [`DailyAttendance`].
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub last_action: Option<AttendanceAction>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sign_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sign_out_time: Option<NaiveDateTime>,
    pub visits: usize,
    pub late: bool,
    pub notes: Option<String>,
}

/// Groups rows of many children and days into per-(child, day) summaries,
/// ordered by child then date.
pub fn summarize_by_child_and_day(rows: &[Attendance]) -> Vec<(u64, DaySummary)> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(u64, NaiveDate), Vec<&Attendance>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.child_id, row.sign_in.date()))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((child_id, date), rows)| (child_id, DailyAttendance::new(rows).summary(date)))
        .collect()
}
