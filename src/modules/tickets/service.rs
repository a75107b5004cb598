use anyhow::Context;
use chrono::Utc;
use rollcall_config::EmailConfig;
use rollcall_core::AppError;
use rollcall_core::dates::{format_query_date, parse_query_date};
use rollcall_core::file_storage::{FileStorage, StorageError, attachment_key};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::model::{Ticket, TicketCreatedResponse, TicketFilter, TicketForm, TicketStatus};
use crate::metrics::{track_ticket_raised, track_ticket_resolved};
use crate::utils::email::{EmailAttachment, EmailService, TicketNotice};

const TICKET_SELECT: &str = r#"
    SELECT t.id, st.name AS student_name, st.sap_id AS student_sap_id,
           c.full_name AS class_key, s.name AS subject, te.name AS teacher_name,
           t.reason, t.attendance_date, t.file_original_name AS file_name,
           t.status, t.created_at, t.updated_at
    FROM tickets t
    JOIN users st ON st.id = t.student_id
    JOIN users te ON te.id = t.teacher_id
    JOIN class_sections c ON c.id = t.class_id
    JOIN subjects s ON s.id = t.subject_id
"#;

/// An uploaded supporting letter.
#[derive(Debug, Clone)]
pub struct LetterUpload {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, FromRow)]
struct StudentRow {
    name: String,
    sap_id: String,
    class_id: Uuid,
    class_key: String,
}

#[derive(Debug, FromRow)]
struct AssignedTeacher {
    id: Uuid,
    email: Option<String>,
    subject_id: Uuid,
}

fn storage_error(err: StorageError) -> AppError {
    if err.is_client_error() {
        AppError::bad_request(err)
    } else {
        AppError::internal(anyhow::Error::from(err).context("Failed to store attachment"))
    }
}

pub struct TicketService;

impl TicketService {
    /// Raises a ticket with the teacher assigned to the student's class and
    /// `subject`, for a date on which attendance was taken.
    #[instrument(skip(db, storage, email_config, form, letter))]
    pub async fn create_ticket(
        db: &PgPool,
        storage: &dyn FileStorage,
        email_config: &EmailConfig,
        student_id: Uuid,
        form: TicketForm,
        letter: Option<LetterUpload>,
    ) -> Result<TicketCreatedResponse, AppError> {
        let (subject, reason, date) = form
            .required_fields()
            .map_err(|field| AppError::bad_request(anyhow::anyhow!("{} is required", field)))?;
        let date = parse_query_date(date).map_err(AppError::bad_request)?;

        if let Some(letter) = &letter {
            storage
                .validate(&letter.content_type, letter.content.len())
                .map_err(storage_error)?;
        }

        let student = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT u.name, u.sap_id, u.class_id, c.full_name AS class_key
            FROM users u
            JOIN class_sections c ON c.id = u.class_id
            WHERE u.id = $1 AND u.role = 'student'
            "#,
        )
        .bind(student_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch student")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        let teacher = sqlx::query_as::<_, AssignedTeacher>(
            r#"
            SELECT u.id, u.email, s.id AS subject_id
            FROM users u
            JOIN teacher_classes tc ON tc.teacher_id = u.id
            JOIN teacher_subjects ts ON ts.teacher_id = u.id
            JOIN subjects s ON s.id = ts.subject_id
            JOIN subject_classes sc ON sc.subject_id = s.id AND sc.class_id = tc.class_id
            WHERE tc.class_id = $1 AND s.name = $2
            ORDER BY u.name
            LIMIT 1
            "#,
        )
        .bind(student.class_id)
        .bind(subject)
        .fetch_optional(db)
        .await
        .context("Failed to find assigned teacher")
        .map_err(AppError::database)?
        .ok_or_else(|| {
            AppError::not_found(anyhow::anyhow!(
                "No teacher assigned to {} for {}",
                subject,
                student.class_key
            ))
        })?;

        let session_exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM attendance_sessions
                WHERE class_id = $1 AND subject_id = $2 AND session_date = $3
            )
            "#,
        )
        .bind(student.class_id)
        .bind(teacher.subject_id)
        .bind(date)
        .fetch_one(db)
        .await
        .context("Failed to check attendance session")
        .map_err(AppError::database)?;

        if !session_exists {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "No attendance was taken for {} on {}",
                subject,
                format_query_date(date)
            )));
        }

        let file_key = match &letter {
            Some(letter) => {
                let key = attachment_key(Utc::now().timestamp_millis(), &letter.file_name);
                Some(storage.save(&key, &letter.content).await.map_err(storage_error)?)
            }
            None => None,
        };

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO tickets
                (student_id, class_id, subject_id, teacher_id, reason, attendance_date,
                 file_key, file_original_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(student_id)
        .bind(student.class_id)
        .bind(teacher.subject_id)
        .bind(teacher.id)
        .bind(reason)
        .bind(date)
        .bind(file_key.as_deref())
        .bind(letter.as_ref().map(|l| l.file_name.as_str()))
        .fetch_one(db)
        .await;

        let ticket_id = match inserted {
            Ok(id) => id,
            Err(e) => {
                if let Some(key) = &file_key
                    && let Err(cleanup) = storage.delete(key).await
                {
                    tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned attachment");
                }
                return Err(AppError::database(
                    anyhow::Error::from(e).context("Failed to create ticket"),
                ));
            }
        };

        track_ticket_raised(letter.is_some());
        tracing::info!(ticket_id = %ticket_id, "Ticket raised");

        let notice = TicketNotice {
            student_name: student.name,
            student_sap_id: student.sap_id,
            class_key: student.class_key,
            subject: subject.to_string(),
            date: format_query_date(date),
            reason: reason.to_string(),
        };
        let notified =
            Self::notify_teacher(email_config, teacher.email.as_deref(), &notice, letter).await;

        let ticket = Self::get_ticket(db, ticket_id).await?;
        Ok(TicketCreatedResponse {
            message: "Request submitted successfully".to_string(),
            ticket,
            notified,
        })
    }

    /// Email failures are logged; the ticket stands either way.
    async fn notify_teacher(
        email_config: &EmailConfig,
        teacher_email: Option<&str>,
        notice: &TicketNotice,
        letter: Option<LetterUpload>,
    ) -> bool {
        let Some(to_email) = teacher_email.filter(|e| !e.trim().is_empty()) else {
            tracing::info!("Teacher has no email address, skipping ticket notification");
            return false;
        };
        if !email_config.enabled {
            tracing::info!("Email disabled, skipping ticket notification");
            return false;
        }

        let attachment = letter.map(|l| EmailAttachment {
            file_name: l.file_name,
            content_type: l.content_type,
            content: l.content,
        });

        match EmailService::new(email_config.clone())
            .send_ticket_notification(to_email, notice, attachment)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = ?e.error, "Failed to send ticket notification");
                false
            }
        }
    }

    #[instrument(skip(db))]
    pub async fn get_ticket(db: &PgPool, ticket_id: Uuid) -> Result<Ticket, AppError> {
        let query = format!("{TICKET_SELECT} WHERE t.id = $1");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch ticket")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Ticket not found")))
    }

    #[instrument(skip(db))]
    pub async fn student_tickets(db: &PgPool, student_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        let query = format!("{TICKET_SELECT} WHERE t.student_id = $1 ORDER BY t.created_at DESC");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(student_id)
            .fetch_all(db)
            .await
            .context("Failed to fetch tickets")
            .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn teacher_tickets(
        db: &PgPool,
        teacher_id: Uuid,
        filter: TicketFilter,
    ) -> Result<Vec<Ticket>, AppError> {
        let query = format!(
            "{TICKET_SELECT}
            WHERE t.teacher_id = $1 AND ($2::ticket_status IS NULL OR t.status = $2)
            ORDER BY t.created_at DESC"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(teacher_id)
            .bind(filter.status)
            .fetch_all(db)
            .await
            .context("Failed to fetch tickets")
            .map_err(AppError::database)
    }

    /// Approves or rejects a ticket addressed to `teacher_id`.
    #[instrument(skip(db))]
    pub async fn update_status(
        db: &PgPool,
        teacher_id: Uuid,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Ticket, AppError> {
        if !status.is_resolution() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Status must be approved or rejected"
            )));
        }

        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE tickets SET status = $1, updated_at = NOW()
            WHERE id = $2 AND teacher_id = $3
            RETURNING id
            "#,
        )
        .bind(status)
        .bind(ticket_id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await
        .context("Failed to update ticket")
        .map_err(AppError::database)?;

        if updated.is_none() {
            return Err(AppError::not_found(anyhow::anyhow!("Ticket not found")));
        }

        track_ticket_resolved(status.as_str());
        tracing::info!(ticket_id = %ticket_id, status = %status, "Ticket resolved");
        Self::get_ticket(db, ticket_id).await
    }
}
