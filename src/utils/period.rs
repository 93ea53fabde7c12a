use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};

/// Attendance is recorded in the server's local time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    local_now().date()
}

/// Monday..=Sunday of the week containing `day`.
pub fn week_of(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

/// First of the month..=`day`.
pub fn month_to_date(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    (day.with_day(1).unwrap_or(day), day)
}

/// Validated `from..=to`, defaulting to the `default_days` days ending at `today`.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    default_days: i64,
) -> Result<(NaiveDate, NaiveDate), &'static str> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(default_days - 1));
    if from > to {
        return Err("from cannot be after to");
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-06-04 is a Wednesday
        assert_eq!(week_of(d(2025, 6, 4)), (d(2025, 6, 2), d(2025, 6, 8)));
        assert_eq!(week_of(d(2025, 6, 2)), (d(2025, 6, 2), d(2025, 6, 8)));
        assert_eq!(week_of(d(2025, 6, 8)), (d(2025, 6, 2), d(2025, 6, 8)));
    }

    #[test]
    fn week_can_span_months() {
        assert_eq!(week_of(d(2025, 7, 1)), (d(2025, 6, 30), d(2025, 7, 6)));
    }

    #[test]
    fn month_to_date_starts_on_the_first() {
        assert_eq!(month_to_date(d(2025, 2, 17)), (d(2025, 2, 1), d(2025, 2, 17)));
        assert_eq!(month_to_date(d(2025, 2, 1)), (d(2025, 2, 1), d(2025, 2, 1)));
    }

    #[test]
    fn range_defaults_and_validation() {
        let today = d(2025, 6, 30);
        assert_eq!(resolve_range(None, None, today, 30).unwrap(), (d(2025, 6, 1), today));
        assert_eq!(
            resolve_range(Some(d(2025, 6, 10)), None, today, 30).unwrap(),
            (d(2025, 6, 10), today)
        );
        assert!(resolve_range(Some(d(2025, 7, 1)), Some(d(2025, 6, 1)), today, 30).is_err());
    }
}
