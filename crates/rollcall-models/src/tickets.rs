use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Approved,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Approved => "approved",
            TicketStatus::Rejected => "rejected",
        }
    }

    /// Whether a teacher may move a ticket into this status.
    pub fn is_resolution(&self) -> bool {
        !matches!(self, TicketStatus::Pending)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub student_name: String,
    pub student_sap_id: String,
    pub class_key: String,
    pub subject: String,
    pub teacher_name: String,
    pub reason: String,
    pub attendance_date: NaiveDate,
    /// Original name of the attached letter, if any
    pub file_name: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text fields of the multipart ticket form, collected before validation.
#[derive(Debug, Clone, Default)]
pub struct TicketForm {
    pub subject: Option<String>,
    pub reason: Option<String>,
    pub date: Option<String>,
}

impl TicketForm {
    /// Returns `(subject, reason, date)` or the name of the first missing field.
    pub fn required_fields(&self) -> Result<(&str, &str, &str), &'static str> {
        fn non_empty<'a>(v: &'a Option<String>, name: &'static str) -> Result<&'a str, &'static str> {
            match v.as_deref().map(str::trim) {
                Some(s) if !s.is_empty() => Ok(s),
                _ => Err(name),
            }
        }

        Ok((
            non_empty(&self.subject, "subject")?,
            non_empty(&self.reason, "reason")?,
            non_empty(&self.date, "date")?,
        ))
    }
}

/// Documents the multipart body of `POST /api/student/tickets`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateTicketForm {
    pub subject: String,
    pub reason: String,
    /// Attendance date as `dd-mm-yyyy`
    pub date: String,
    /// PDF or Word document, at most 5 MiB
    #[schema(value_type = Option<String>, format = Binary)]
    pub letter: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketCreatedResponse {
    pub message: String,
    pub ticket: Ticket,
    /// Whether the assigned teacher was notified by email
    pub notified: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketStatusDto {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TicketStatus::Approved).unwrap(), "\"approved\"");
        let status: TicketStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, TicketStatus::Rejected);
        assert!(serde_json::from_str::<TicketStatus>("\"closed\"").is_err());
    }

    #[test]
    fn test_only_final_statuses_resolve() {
        assert!(!TicketStatus::Pending.is_resolution());
        assert!(TicketStatus::Approved.is_resolution());
        assert!(TicketStatus::Rejected.is_resolution());
    }

    #[test]
    fn test_ticket_form_required_fields() {
        let form = TicketForm {
            subject: Some("Maths".to_string()),
            reason: Some("  ".to_string()),
            date: Some("13-05-2024".to_string()),
        };
        assert_eq!(form.required_fields(), Err("reason"));

        let form = TicketForm {
            reason: Some("Was present".to_string()),
            ..form
        };
        assert_eq!(form.required_fields(), Ok(("Maths", "Was present", "13-05-2024")));

        assert_eq!(TicketForm::default().required_fields(), Err("subject"));
    }
}
