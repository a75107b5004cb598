use std::collections::HashMap;

use anyhow::Context;
use rollcall_core::AppError;
use rollcall_db::{is_foreign_key_violation, is_unique_violation};
use rollcall_models::schedule::{parse_timings, validate_schedule};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::model::{
    CreateSubjectDto, ExistingTiming, ScheduleError, Subject, SubjectRow, Timing, TimingRow,
    UpdateSubjectDto, day_labels,
};
use crate::metrics::track_subject_conflict;
use crate::modules::classes::service::ClassService;

#[derive(Debug, FromRow)]
struct ClassTimingRow {
    class_id: Uuid,
    #[sqlx(flatten)]
    timing: TimingRow,
}

fn schedule_error(err: ScheduleError) -> AppError {
    match &err {
        ScheduleError::InternalOverlap { .. } => track_subject_conflict("internal"),
        ScheduleError::ClassConflict { .. } => track_subject_conflict("class"),
        _ => {}
    }
    AppError::bad_request(err)
}

fn corrupt_timing(err: ScheduleError) -> AppError {
    AppError::internal(anyhow::Error::from(err).context("Stored subject timing is invalid"))
}

pub struct SubjectService;

impl SubjectService {
    #[instrument(skip(db, dto), fields(subject = %dto.name))]
    pub async fn create_subject(db: &PgPool, dto: CreateSubjectDto) -> Result<Subject, AppError> {
        let name = dto.name.trim().to_string();
        let candidate = parse_timings(&dto.timings).map_err(schedule_error)?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let classes = ClassService::resolve_keys(&mut tx, &dto.classes).await?;
        Self::check_schedule(&mut tx, &classes, &candidate, None).await?;

        let subject_id: Uuid =
            sqlx::query_scalar("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
                .bind(&name)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return AppError::bad_request(anyhow::anyhow!(
                            "Subject {} already exists",
                            name
                        ));
                    }
                    AppError::database(anyhow::Error::from(e).context("Failed to create subject"))
                })?;

        Self::replace_classes(&mut tx, subject_id, &classes).await?;
        Self::replace_timings(&mut tx, subject_id, &candidate).await?;

        tx.commit()
            .await
            .context("Failed to commit subject")
            .map_err(AppError::database)?;

        tracing::info!(subject = %name, classes = classes.len(), "Subject created");
        Self::get_subject(db, &name).await
    }

    #[instrument(skip(db))]
    pub async fn list_subjects(db: &PgPool) -> Result<Vec<Subject>, AppError> {
        let rows = sqlx::query_as::<_, SubjectRow>("SELECT * FROM subjects ORDER BY name")
            .fetch_all(db)
            .await
            .context("Failed to fetch subjects")
            .map_err(AppError::database)?;

        Self::assemble(db, rows).await
    }

    /// Subjects taught in one class section.
    #[instrument(skip(db))]
    pub async fn subjects_for_class(db: &PgPool, class_id: Uuid) -> Result<Vec<Subject>, AppError> {
        let rows = sqlx::query_as::<_, SubjectRow>(
            r#"
            SELECT s.*
            FROM subjects s
            JOIN subject_classes sc ON sc.subject_id = s.id
            WHERE sc.class_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(class_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch class subjects")
        .map_err(AppError::database)?;

        Self::assemble(db, rows).await
    }

    #[instrument(skip(db))]
    pub async fn get_subject(db: &PgPool, name: &str) -> Result<Subject, AppError> {
        let row = sqlx::query_as::<_, SubjectRow>("SELECT * FROM subjects WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await
            .context("Failed to fetch subject")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject {} not found", name)))?;

        Self::assemble(db, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::internal_error("Subject vanished while loading".to_string()))
    }

    /// Updates name, classes and/or timings. Whenever classes or timings change
    /// the full schedule check runs again, ignoring this subject's old timings.
    #[instrument(skip(db, dto))]
    pub async fn update_subject(
        db: &PgPool,
        name: &str,
        dto: UpdateSubjectDto,
    ) -> Result<Subject, AppError> {
        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let existing = sqlx::query_as::<_, SubjectRow>(
            "SELECT * FROM subjects WHERE name = $1 FOR UPDATE",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch subject")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject {} not found", name)))?;

        let schedule_changed = dto.classes.is_some() || dto.timings.is_some();

        if schedule_changed {
            let classes = match &dto.classes {
                Some(keys) => ClassService::resolve_keys(&mut tx, keys).await?,
                None => Self::class_refs(&mut tx, existing.id).await?,
            };
            let candidate = match &dto.timings {
                Some(timings) => parse_timings(timings).map_err(schedule_error)?,
                None => Self::subject_timings(&mut tx, existing.id).await?,
            };

            Self::check_schedule(&mut tx, &classes, &candidate, Some(existing.id)).await?;

            if dto.classes.is_some() {
                Self::replace_classes(&mut tx, existing.id, &classes).await?;
            }
            if dto.timings.is_some() {
                Self::replace_timings(&mut tx, existing.id, &candidate).await?;
            }
        }

        let new_name = dto
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name)
            .to_string();

        sqlx::query("UPDATE subjects SET name = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_name)
            .bind(existing.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::bad_request(anyhow::anyhow!(
                        "Subject {} already exists",
                        new_name
                    ));
                }
                AppError::database(anyhow::Error::from(e).context("Failed to update subject"))
            })?;

        tx.commit()
            .await
            .context("Failed to commit subject")
            .map_err(AppError::database)?;

        Self::get_subject(db, &new_name).await
    }

    #[instrument(skip(db))]
    pub async fn delete_subject(db: &PgPool, name: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE name = $1")
            .bind(name)
            .execute(db)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::bad_request(anyhow::anyhow!(
                        "Subject {} is still referenced by teachers, attendance or tickets",
                        name
                    ));
                }
                AppError::database(anyhow::Error::from(e).context("Failed to delete subject"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Subject {} not found", name)));
        }

        Ok(())
    }

    /// Locks the target classes, loads every other subject's timings in them
    /// and runs the conflict check.
    async fn check_schedule(
        conn: &mut PgConnection,
        classes: &[(Uuid, String)],
        candidate: &[Timing],
        exclude_subject: Option<Uuid>,
    ) -> Result<(), AppError> {
        let class_ids: Vec<Uuid> = classes.iter().map(|(id, _)| *id).collect();

        sqlx::query("SELECT id FROM class_sections WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&class_ids)
            .execute(&mut *conn)
            .await
            .context("Failed to lock classes")
            .map_err(AppError::database)?;

        let rows = sqlx::query_as::<_, ClassTimingRow>(
            r#"
            SELECT sc.class_id, t.subject_id, s.name AS subject_name, t.days, t.start_time, t.end_time
            FROM subject_classes sc
            JOIN subjects s ON s.id = sc.subject_id
            JOIN subject_timings t ON t.subject_id = s.id
            WHERE sc.class_id = ANY($1)
              AND ($2::uuid IS NULL OR s.id <> $2)
            ORDER BY s.name, t.position
            "#,
        )
        .bind(&class_ids)
        .bind(exclude_subject)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch class timings")
        .map_err(AppError::database)?;

        let mut by_class: HashMap<Uuid, Vec<ExistingTiming>> = HashMap::new();
        for row in rows {
            let timing = row.timing.to_timing().map_err(corrupt_timing)?;
            by_class.entry(row.class_id).or_default().push(ExistingTiming {
                subject: row.timing.subject_name,
                timing,
            });
        }

        let existing: Vec<(String, Vec<ExistingTiming>)> = classes
            .iter()
            .map(|(id, key)| (key.clone(), by_class.remove(id).unwrap_or_default()))
            .collect();

        validate_schedule(candidate, &existing).map_err(schedule_error)
    }

    async fn replace_classes(
        conn: &mut PgConnection,
        subject_id: Uuid,
        classes: &[(Uuid, String)],
    ) -> Result<(), AppError> {
        let class_ids: Vec<Uuid> = classes.iter().map(|(id, _)| *id).collect();

        sqlx::query("DELETE FROM subject_classes WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&mut *conn)
            .await
            .context("Failed to clear subject classes")
            .map_err(AppError::database)?;

        sqlx::query(
            "INSERT INTO subject_classes (subject_id, class_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(subject_id)
        .bind(&class_ids)
        .execute(&mut *conn)
        .await
        .context("Failed to link subject classes")
        .map_err(AppError::database)?;

        Ok(())
    }

    async fn replace_timings(
        conn: &mut PgConnection,
        subject_id: Uuid,
        timings: &[Timing],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM subject_timings WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&mut *conn)
            .await
            .context("Failed to clear subject timings")
            .map_err(AppError::database)?;

        for (position, timing) in timings.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO subject_timings (subject_id, position, days, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(subject_id)
            .bind(position as i32)
            .bind(day_labels(timing))
            .bind(timing.start().to_naive_time())
            .bind(timing.end().to_naive_time())
            .execute(&mut *conn)
            .await
            .context("Failed to insert subject timing")
            .map_err(AppError::database)?;
        }

        Ok(())
    }

    async fn class_refs(
        conn: &mut PgConnection,
        subject_id: Uuid,
    ) -> Result<Vec<(Uuid, String)>, AppError> {
        sqlx::query_as(
            r#"
            SELECT c.id, c.full_name
            FROM subject_classes sc
            JOIN class_sections c ON c.id = sc.class_id
            WHERE sc.subject_id = $1
            ORDER BY c.full_name
            "#,
        )
        .bind(subject_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch subject classes")
        .map_err(AppError::database)
    }

    async fn subject_timings(
        conn: &mut PgConnection,
        subject_id: Uuid,
    ) -> Result<Vec<Timing>, AppError> {
        let rows = sqlx::query_as::<_, TimingRow>(
            r#"
            SELECT t.subject_id, s.name AS subject_name, t.days, t.start_time, t.end_time
            FROM subject_timings t
            JOIN subjects s ON s.id = t.subject_id
            WHERE t.subject_id = $1
            ORDER BY t.position
            "#,
        )
        .bind(subject_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch subject timings")
        .map_err(AppError::database)?;

        rows.iter()
            .map(|row| row.to_timing().map_err(corrupt_timing))
            .collect()
    }

    /// Attaches class keys and timings to subject rows, keeping their order.
    async fn assemble(db: &PgPool, rows: Vec<SubjectRow>) -> Result<Vec<Subject>, AppError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let class_links: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT sc.subject_id, c.full_name
            FROM subject_classes sc
            JOIN class_sections c ON c.id = sc.class_id
            WHERE sc.subject_id = ANY($1)
            ORDER BY c.full_name
            "#,
        )
        .bind(&ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch subject classes")
        .map_err(AppError::database)?;

        let timing_rows = sqlx::query_as::<_, TimingRow>(
            r#"
            SELECT t.subject_id, s.name AS subject_name, t.days, t.start_time, t.end_time
            FROM subject_timings t
            JOIN subjects s ON s.id = t.subject_id
            WHERE t.subject_id = ANY($1)
            ORDER BY t.subject_id, t.position
            "#,
        )
        .bind(&ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch subject timings")
        .map_err(AppError::database)?;

        let mut classes: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (subject_id, key) in class_links {
            classes.entry(subject_id).or_default().push(key);
        }

        let mut timings: HashMap<Uuid, Vec<_>> = HashMap::new();
        for row in &timing_rows {
            let timing = row.to_timing().map_err(corrupt_timing)?;
            timings.entry(row.subject_id).or_default().push(timing.to_dto());
        }

        Ok(rows
            .into_iter()
            .map(|row| Subject {
                classes: classes.remove(&row.id).unwrap_or_default(),
                timings: timings.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
