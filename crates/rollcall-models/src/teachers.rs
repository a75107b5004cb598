use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub sap_id: String,
    pub email: Option<String>,
    /// Keys of the classes the teacher is assigned to
    pub classes: Vec<String>,
    pub subjects: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Teachers start with their SAP ID as password unless one is given.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "SAP ID is required"))]
    pub sap_id: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub classes: Option<Vec<String>>,
    pub subjects: Option<Vec<String>>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RosterStudent {
    pub name: String,
    pub sap_id: String,
    pub roll_no: Option<String>,
}

/// One slot on a teacher's timetable for a given weekday.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TodayClass {
    pub class_key: String,
    pub subject: String,
    #[schema(example = "09:00 - 10:00")]
    pub timing: String,
    pub start: String,
    pub end: String,
    pub students: Vec<RosterStudent>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TodayClassesQuery {
    /// Weekday override (`Mon`..`Sun`); defaults to today
    pub day: Option<String>,
}
