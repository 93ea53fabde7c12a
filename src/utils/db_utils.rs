use crate::error::AppError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Tables that accept partial JSON updates, with the columns a client may set.
pub struct UpdatableTable {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

pub const CENTERS: UpdatableTable = UpdatableTable {
    table: "centers",
    columns: &["name", "address", "phone", "email", "capacity", "opening_time"],
};

pub const PARENTS: UpdatableTable = UpdatableTable {
    table: "parents",
    columns: &["name", "email", "phone", "address"],
};

pub const CHILDREN: UpdatableTable = UpdatableTable {
    table: "children",
    columns: &[
        "name",
        "date_of_birth",
        "gender",
        "allergies",
        "medical_conditions",
        "emergency_contact",
        "emergency_phone",
        "profile_picture",
        "parent_id",
        "center_id",
    ],
};

pub const TEACHERS: UpdatableTable = UpdatableTable {
    table: "teachers",
    columns: &["center_id", "position", "profile_picture"],
};

fn to_sql_value(value: &Value) -> Result<SqlValue, AppError> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
                SqlValue::Time(t)
            } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
                SqlValue::Time(t)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(AppError::bad_request("Unsupported number"));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(AppError::bad_request("Unsupported JSON value type")),
    })
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from the payload keys, so each key must be listed in
/// `target.columns`; anything else is rejected.
pub fn build_update_sql(
    target: &UpdatableTable,
    payload: &Value,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::bad_request("No fields provided for update"));
    }

    if let Some(bad) = obj.keys().find(|k| !target.columns.contains(&k.as_str())) {
        return Err(AppError::bad_request(format!("Field '{}' cannot be updated", bad)));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE id = ?",
        target.table, set_clause
    );

    let mut values = Vec::with_capacity(obj.len() + 1);
    for value in obj.values() {
        values.push(to_sql_value(value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Page/per-page pair clamped to sane bounds, plus the derived offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, 100),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

/// Id of a referenced row in a partial update. Absent or `null` gives `None`.
pub fn referenced_id(body: &Value, key: &str) -> Result<Option<u64>, AppError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("{} must be a number", key))),
    }
}

pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_set_clause_for_allowed_columns() {
        let update = build_update_sql(
            &CENTERS,
            &json!({"name": "Little Oaks", "opening_time": "08:00"}),
            5,
        )
        .unwrap();

        assert!(update.sql.starts_with("UPDATE centers SET "));
        assert!(update.sql.contains("name = ?"));
        assert!(update.sql.contains("opening_time = ?"));
        assert!(update.sql.ends_with("WHERE id = ?"));
        assert_eq!(update.values.len(), 3);
        assert!(update.values.contains(&SqlValue::Time(NaiveTime::from_hms_opt(8, 0, 0).unwrap())));
        assert_eq!(update.values.last(), Some(&SqlValue::I64(5)));
    }

    #[test]
    fn rejects_unknown_columns() {
        let err = build_update_sql(&PARENTS, &json!({"id": 9}), 1).unwrap_err();
        assert!(err.to_string().contains("'id'"));

        let err = build_update_sql(&CHILDREN, &json!({"name = 'x' --": 1}), 1).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql(&TEACHERS, &json!({}), 1).is_err());
        assert!(build_update_sql(&TEACHERS, &json!([1, 2]), 1).is_err());
        assert!(build_update_sql(&TEACHERS, &json!({"position": {"a": 1}}), 1).is_err());
    }

    #[test]
    fn converts_dates_and_nulls() {
        let update = build_update_sql(
            &CHILDREN,
            &json!({"date_of_birth": "2021-02-03", "center_id": null}),
            2,
        )
        .unwrap();
        assert!(update.values.contains(&SqlValue::Date(NaiveDate::from_ymd_opt(2021, 2, 3).unwrap())));
        assert!(update.values.contains(&SqlValue::Null));
    }

    #[test]
    fn page_is_clamped() {
        let p = Page::new(Some(0), Some(1000), 20);
        assert_eq!(p, Page { page: 1, per_page: 100 });
        assert_eq!(p.offset(), 0);

        let p = Page::new(Some(3), None, 20);
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn referenced_id_reads_numbers_and_skips_nulls() {
        assert_eq!(referenced_id(&json!({"center_id": 4}), "center_id").unwrap(), Some(4));
        assert_eq!(referenced_id(&json!({"center_id": null}), "center_id").unwrap(), None);
        assert_eq!(referenced_id(&json!({"name": "Mia"}), "center_id").unwrap(), None);

        let err = referenced_id(&json!({"center_id": "four"}), "center_id").unwrap_err();
        assert_eq!(err.to_string(), "center_id must be a number");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" mia "), "%mia%");
        assert_eq!(like_pattern("50%_"), "%50\\%\\_%");
    }
}
