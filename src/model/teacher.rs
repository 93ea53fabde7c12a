use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Teacher {
    #[schema(example = 1)]
    pub id: u64,

    /// Login account backing this profile
    #[schema(example = 4)]
    pub user_id: u64,

    #[schema(example = 1, nullable = true)]
    pub center_id: Option<u64>,

    #[schema(example = "Teacher")]
    pub position: String,

    #[schema(nullable = true)]
    pub profile_picture: Option<String>,
}
