use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Sunshine Kids",
        "address": "12 Main St",
        "phone": "+6491234567",
        "email": "hello@sunshine.example",
        "capacity": 40,
        "opening_time": "08:30:00"
    })
)]
pub struct Center {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Sunshine Kids")]
    pub name: String,

    #[schema(example = "12 Main St")]
    pub address: String,

    #[schema(example = "+6491234567")]
    pub phone: String,

    #[schema(example = "hello@sunshine.example")]
    pub email: String,

    #[schema(example = 40)]
    pub capacity: i32,

    #[schema(example = "08:30:00", value_type = String, format = "time")]
    pub opening_time: NaiveTime,
}

pub fn default_opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN)
}

impl Center {
    /// Latest on-time arrival on the arrival's day: opening time plus the
    /// grace period. `None` when the grace period is not representable.
    pub fn late_after(&self, arrived: NaiveDateTime, grace_minutes: i64) -> Option<NaiveDateTime> {
        let grace = Duration::try_minutes(grace_minutes.max(0))?;
        arrived
            .date()
            .and_time(self.opening_time)
            .checked_add_signed(grace)
    }

    /// Arriving exactly at the threshold is on time.
    pub fn is_late(&self, arrived: NaiveDateTime, grace_minutes: i64) -> bool {
        self.late_after(arrived, grace_minutes)
            .is_some_and(|threshold| arrived > threshold)
    }

    pub fn late_reason(&self, arrived: NaiveDateTime) -> String {
        let minutes = (arrived.time() - self.opening_time).num_minutes();
        format!(
            "Arrived {} min after opening ({})",
            minutes,
            self.opening_time.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn center() -> Center {
        Center {
            id: 1,
            name: "Sunshine".into(),
            address: "1 Road".into(),
            phone: "000".into(),
            email: "c@x.com".into(),
            capacity: 20,
            opening_time: default_opening_time(),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn before_and_at_opening_is_on_time() {
        let c = center();
        assert!(!c.is_late(at(7, 55, 0), 0));
        assert!(!c.is_late(at(8, 30, 0), 0));
    }

    #[test]
    fn after_opening_is_late() {
        let c = center();
        assert!(c.is_late(at(8, 30, 1), 0));
        assert!(c.is_late(at(14, 0, 0), 0));
    }

    #[test]
    fn grace_period_moves_threshold() {
        let c = center();
        assert!(!c.is_late(at(8, 40, 0), 10));
        assert!(c.is_late(at(8, 40, 1), 10));
        // negative grace is treated as none
        assert!(c.is_late(at(8, 31, 0), -15));
    }

    #[test]
    fn grace_past_midnight_does_not_wrap() {
        let c = center();
        assert_eq!(
            c.late_after(at(8, 0, 0), 960),
            Some(at(0, 30, 0) + Duration::days(1))
        );
        assert!(!c.is_late(at(8, 0, 0), 960));
        assert!(!c.is_late(at(23, 59, 59), 960));
    }

    #[test]
    fn huge_grace_is_never_late_and_never_panics() {
        let c = center();
        assert_eq!(c.late_after(at(9, 0, 0), i64::MAX / 1000), None);
        assert!(!c.is_late(at(9, 0, 0), i64::MAX / 1000));
        assert!(!c.is_late(at(9, 0, 0), i64::MAX));
    }

    #[test]
    fn late_reason_mentions_minutes() {
        let c = center();
        assert_eq!(
            c.late_reason(at(9, 0, 0)),
            "Arrived 30 min after opening (08:30)"
        );
    }
}
