//! Class sections (divisions), addressed by their composite key
//! `{year}-{name}-{batch}`, e.g. `2023-SE-IT-A-morning`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "class_batch", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Batch {
    Morning,
    Evening,
}

impl Batch {
    pub fn as_str(self) -> &'static str {
        match self {
            Batch::Morning => "morning",
            Batch::Evening => "evening",
        }
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn class_key(year: &str, name: &str, batch: Batch) -> String {
    format!("{}-{}-{}", year.trim(), name.trim(), batch)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClassSection {
    pub id: Uuid,
    #[schema(example = "2023")]
    pub year: String,
    #[schema(example = "SE-IT-A")]
    pub name: String,
    pub batch: Batch,
    pub num_students: i32,
    /// Composite key, unique across classes
    #[schema(example = "2023-SE-IT-A-morning")]
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    #[validate(length(min = 1, max = 16, message = "Year is required"))]
    pub year: String,
    #[validate(length(min = 1, max = 64, message = "Class name is required"))]
    pub name: String,
    pub batch: Batch,
    #[validate(range(min = 0, message = "Number of students cannot be negative"))]
    #[serde(default)]
    pub num_students: i32,
}

impl CreateClassDto {
    pub fn key(&self) -> String {
        class_key(&self.year, &self.name, self.batch)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, max = 16))]
    pub year: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    pub batch: Option<Batch>,
    #[validate(range(min = 0, message = "Number of students cannot be negative"))]
    pub num_students: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_class_key_format() {
        assert_eq!(
            class_key("2023", "SE-IT-A", Batch::Morning),
            "2023-SE-IT-A-morning"
        );
        assert_eq!(class_key(" 2024 ", " B ", Batch::Evening), "2024-B-evening");
    }

    #[test]
    fn test_create_class_validation() {
        let dto: CreateClassDto = serde_json::from_value(serde_json::json!({
            "year": "2023",
            "name": "SE-IT-A",
            "batch": "morning",
            "num_students": 60
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.key(), "2023-SE-IT-A-morning");

        let bad = CreateClassDto {
            year: String::new(),
            num_students: -1,
            ..dto
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("year"));
        assert!(errors.field_errors().contains_key("num_students"));
    }

    #[test]
    fn test_unknown_batch_is_rejected() {
        let result: Result<CreateClassDto, _> = serde_json::from_value(serde_json::json!({
            "year": "2023",
            "name": "A",
            "batch": "night"
        }));
        assert!(result.is_err());
    }
}
