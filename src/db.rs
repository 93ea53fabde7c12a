use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Half-open `[start, end)` datetime bounds covering `date`.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// Half-open bounds covering `from..=to`.
pub fn range_bounds(from: NaiveDate, to: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let (start, _) = day_bounds(from);
    let (_, end) = day_bounds(to);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_span_one_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let (start, end) = day_bounds(d);
        assert_eq!(start.to_string(), "2025-03-31 00:00:00");
        assert_eq!(end.to_string(), "2025-04-01 00:00:00");
    }

    #[test]
    fn range_bounds_include_last_day() {
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let (start, end) = range_bounds(from, to);
        assert_eq!(start.date(), from);
        assert_eq!(end.date(), NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
    }
}
