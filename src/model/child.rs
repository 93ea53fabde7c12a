use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, ToSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Child {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Mia Jones")]
    pub name: String,

    #[schema(example = "2021-04-09", value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,

    /// Male, Female or Other
    #[schema(example = "Female")]
    pub gender: String,

    #[schema(nullable = true)]
    pub allergies: Option<String>,

    #[schema(nullable = true)]
    pub medical_conditions: Option<String>,

    #[schema(example = "Tom Jones")]
    pub emergency_contact: String,

    #[schema(example = "0219876543")]
    pub emergency_phone: String,

    #[schema(nullable = true)]
    pub profile_picture: Option<String>,

    #[schema(example = 1)]
    pub parent_id: u64,

    #[schema(example = 1, nullable = true)]
    pub center_id: Option<u64>,
}

/// A child joined with the names shown next to it in lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ChildListing {
    pub id: u64,
    pub name: String,
    pub parent_id: u64,
    pub parent_name: String,
    pub center_id: Option<u64>,
    pub center_name: Option<String>,
    pub profile_picture: Option<String>,
}

impl ChildListing {
    pub fn center_label(&self) -> &str {
        self.center_name.as_deref().unwrap_or("No center assigned")
    }
}

impl Child {
    pub fn picture_url<'a>(&'a self, default: &'a str) -> &'a str {
        picture_or_default(self.profile_picture.as_deref(), default)
    }
}

pub fn picture_or_default<'a>(picture: Option<&'a str>, default: &'a str) -> &'a str {
    match picture {
        Some(p) if !p.trim().is_empty() => p,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn gender_parses_stored_names() {
        assert_eq!(Gender::from_str("Female").unwrap(), Gender::Female);
        assert_eq!(Gender::Other.as_ref(), "Other");
        assert!(Gender::from_str("female").is_err());
    }

    #[test]
    fn blank_picture_falls_back() {
        let default = "/static/default.png";
        assert_eq!(picture_or_default(None, default), default);
        assert_eq!(picture_or_default(Some(" "), default), default);
        assert_eq!(picture_or_default(Some("/media/a.png"), default), "/media/a.png");
    }
}
