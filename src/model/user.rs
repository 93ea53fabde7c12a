use serde::Serialize;

/// Row shape used by login: the account plus its teacher profile, if any.
#[derive(Debug, sqlx::FromRow)]
pub struct UserWithProfile {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub is_active: bool,
    pub teacher_id: Option<u64>,
    pub center_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub user_id: u64,
    pub username: String,
    pub role: crate::model::role::Role,
    pub teacher_id: Option<u64>,
    pub center_id: Option<u64>,
}
