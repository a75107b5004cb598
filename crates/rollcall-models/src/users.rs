//! Users of every role share one table keyed by a unique SAP ID.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// Full `users` row, including the password hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub sap_id: String,
    pub password: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub class_id: Option<Uuid>,
    pub roll_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub sap_id: String,
    pub role: UserRole,
    pub email: Option<String>,
    /// Class key for students
    pub class_key: Option<String>,
    pub roll_no: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Admin, UserRole::Teacher, UserRole::Student] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("system_admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Teacher).unwrap(),
            r#""teacher""#
        );
    }
}
