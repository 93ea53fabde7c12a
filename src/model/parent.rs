use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Parent {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Sarah Smith")]
    pub name: String,

    #[schema(example = "sarah@example.com")]
    pub email: String,

    #[schema(example = "0211234567", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "4 Oak St", nullable = true)]
    pub address: Option<String>,
}
