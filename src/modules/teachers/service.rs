use std::collections::HashMap;

use anyhow::Context;
use rollcall_core::{AppError, hash_password};
use rollcall_db::is_unique_violation;
use rollcall_models::Weekday;
use rollcall_models::subjects::TimingRow;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::model::{CreateTeacherDto, RosterStudent, Teacher, TodayClass, UpdateTeacherDto};
use crate::metrics::track_user_created;
use crate::modules::classes::service::ClassService;

#[derive(Debug, FromRow)]
struct TeacherRow {
    id: Uuid,
    name: String,
    sap_id: String,
    email: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct SlotRow {
    class_id: Uuid,
    class_key: String,
    #[sqlx(flatten)]
    timing: TimingRow,
}

#[derive(Debug, FromRow)]
struct RosterRow {
    class_id: Uuid,
    #[sqlx(flatten)]
    student: RosterStudent,
}

pub struct TeacherService;

impl TeacherService {
    #[instrument(skip(db, dto), fields(sap_id = %dto.sap_id))]
    pub async fn create_teacher(db: &PgPool, dto: CreateTeacherDto) -> Result<Teacher, AppError> {
        let sap_id = dto.sap_id.trim().to_string();
        let password = dto.password.as_deref().unwrap_or(&sap_id);
        let hashed_password = hash_password(password)?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let teacher_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, sap_id, password, role, email)
            VALUES ($1, $2, $3, 'teacher', $4)
            RETURNING id
            "#,
        )
        .bind(dto.name.trim())
        .bind(&sap_id)
        .bind(hashed_password)
        .bind(dto.email.as_deref().map(str::trim))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::bad_request(anyhow::anyhow!(
                    "User with SAP ID {} already exists",
                    sap_id
                ));
            }
            AppError::database(anyhow::Error::from(e).context("Failed to create teacher"))
        })?;

        Self::replace_assignments(&mut tx, teacher_id, Some(&dto.classes), Some(&dto.subjects))
            .await?;

        tx.commit()
            .await
            .context("Failed to commit teacher")
            .map_err(AppError::database)?;

        track_user_created("teacher");
        tracing::info!(sap_id = %sap_id, "Teacher created");
        Self::get_teacher(db, &sap_id).await
    }

    #[instrument(skip(db))]
    pub async fn list_teachers(db: &PgPool) -> Result<Vec<Teacher>, AppError> {
        let rows = sqlx::query_as::<_, TeacherRow>(
            r#"
            SELECT id, name, sap_id, email, created_at, updated_at
            FROM users
            WHERE role = 'teacher'
            ORDER BY name
            "#,
        )
        .fetch_all(db)
        .await
        .context("Failed to fetch teachers")
        .map_err(AppError::database)?;

        Self::assemble(db, rows).await
    }

    #[instrument(skip(db))]
    pub async fn get_teacher(db: &PgPool, sap_id: &str) -> Result<Teacher, AppError> {
        let row = sqlx::query_as::<_, TeacherRow>(
            r#"
            SELECT id, name, sap_id, email, created_at, updated_at
            FROM users
            WHERE sap_id = $1 AND role = 'teacher'
            "#,
        )
        .bind(sap_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch teacher")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))?;

        Self::assemble(db, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::internal_error("Teacher vanished while loading".to_string()))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_teacher(
        db: &PgPool,
        sap_id: &str,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let existing = sqlx::query_as::<_, TeacherRow>(
            r#"
            SELECT id, name, sap_id, email, created_at, updated_at
            FROM users
            WHERE sap_id = $1 AND role = 'teacher'
            FOR UPDATE
            "#,
        )
        .bind(sap_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch teacher")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))?;

        let name = dto.name.as_deref().map(str::trim).unwrap_or(&existing.name);
        let email = dto.email.as_deref().map(str::trim).or(existing.email.as_deref());
        let hashed_password = dto.password.as_deref().map(hash_password).transpose()?;

        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, email = $2, password = COALESCE($3, password), updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(existing.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update teacher")
        .map_err(AppError::database)?;

        Self::replace_assignments(
            &mut tx,
            existing.id,
            dto.classes.as_deref(),
            dto.subjects.as_deref(),
        )
        .await?;

        tx.commit()
            .await
            .context("Failed to commit teacher")
            .map_err(AppError::database)?;

        Self::get_teacher(db, sap_id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_teacher(db: &PgPool, sap_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE sap_id = $1 AND role = 'teacher'")
            .bind(sap_id)
            .execute(db)
            .await
            .context("Failed to delete teacher")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Teacher not found")));
        }

        Ok(())
    }

    /// Slots the teacher takes on `day`, each with the class roster, ordered by start time.
    #[instrument(skip(db))]
    pub async fn today_classes(
        db: &PgPool,
        teacher_id: Uuid,
        day: Weekday,
    ) -> Result<Vec<TodayClass>, AppError> {
        let slots = sqlx::query_as::<_, SlotRow>(
            r#"
            SELECT c.id AS class_id, c.full_name AS class_key,
                   t.subject_id, s.name AS subject_name, t.days, t.start_time, t.end_time
            FROM teacher_subjects ts
            JOIN subjects s ON s.id = ts.subject_id
            JOIN subject_classes sc ON sc.subject_id = s.id
            JOIN teacher_classes tc ON tc.class_id = sc.class_id AND tc.teacher_id = ts.teacher_id
            JOIN class_sections c ON c.id = sc.class_id
            JOIN subject_timings t ON t.subject_id = s.id
            WHERE ts.teacher_id = $1 AND $2 = ANY(t.days)
            ORDER BY t.start_time, c.full_name, s.name
            "#,
        )
        .bind(teacher_id)
        .bind(day.label())
        .fetch_all(db)
        .await
        .context("Failed to fetch today's classes")
        .map_err(AppError::database)?;

        let class_ids: Vec<Uuid> = slots.iter().map(|s| s.class_id).collect();
        let rosters = Self::rosters(db, &class_ids).await?;

        slots
            .into_iter()
            .map(|slot| {
                let timing = slot.timing.to_timing().map_err(|e| {
                    AppError::internal(anyhow::Error::from(e).context("Stored timing is invalid"))
                })?;
                Ok(TodayClass {
                    students: rosters.get(&slot.class_id).cloned().unwrap_or_default(),
                    class_key: slot.class_key,
                    subject: slot.timing.subject_name,
                    timing: timing.slot_label(),
                    start: timing.start().to_string(),
                    end: timing.end().to_string(),
                })
            })
            .collect()
    }

    async fn rosters(
        db: &PgPool,
        class_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<RosterStudent>>, AppError> {
        let rows = sqlx::query_as::<_, RosterRow>(
            r#"
            SELECT class_id, name, sap_id, roll_no
            FROM users
            WHERE role = 'student' AND class_id = ANY($1)
            ORDER BY roll_no NULLS LAST, name
            "#,
        )
        .bind(class_ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch class rosters")
        .map_err(AppError::database)?;

        let mut rosters: HashMap<Uuid, Vec<RosterStudent>> = HashMap::new();
        for row in rows {
            rosters.entry(row.class_id).or_default().push(row.student);
        }
        Ok(rosters)
    }

    async fn replace_assignments(
        conn: &mut PgConnection,
        teacher_id: Uuid,
        classes: Option<&[String]>,
        subjects: Option<&[String]>,
    ) -> Result<(), AppError> {
        if let Some(keys) = classes {
            let class_ids: Vec<Uuid> = ClassService::resolve_keys(&mut *conn, keys)
                .await?
                .into_iter()
                .map(|(id, _)| id)
                .collect();

            sqlx::query("DELETE FROM teacher_classes WHERE teacher_id = $1")
                .bind(teacher_id)
                .execute(&mut *conn)
                .await
                .context("Failed to clear teacher classes")
                .map_err(AppError::database)?;

            sqlx::query(
                "INSERT INTO teacher_classes (teacher_id, class_id) SELECT $1, UNNEST($2::uuid[])",
            )
            .bind(teacher_id)
            .bind(&class_ids)
            .execute(&mut *conn)
            .await
            .context("Failed to assign teacher classes")
            .map_err(AppError::database)?;
        }

        if let Some(names) = subjects {
            let subject_ids = Self::resolve_subjects(&mut *conn, names).await?;

            sqlx::query("DELETE FROM teacher_subjects WHERE teacher_id = $1")
                .bind(teacher_id)
                .execute(&mut *conn)
                .await
                .context("Failed to clear teacher subjects")
                .map_err(AppError::database)?;

            sqlx::query(
                "INSERT INTO teacher_subjects (teacher_id, subject_id) SELECT $1, UNNEST($2::uuid[])",
            )
            .bind(teacher_id)
            .bind(&subject_ids)
            .execute(&mut *conn)
            .await
            .context("Failed to assign teacher subjects")
            .map_err(AppError::database)?;
        }

        Ok(())
    }

    async fn resolve_subjects(
        conn: &mut PgConnection,
        names: &[String],
    ) -> Result<Vec<Uuid>, AppError> {
        let mut wanted: Vec<String> = names.iter().map(|n| n.trim().to_string()).collect();
        wanted.sort();
        wanted.dedup();

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM subjects WHERE name = ANY($1)")
                .bind(&wanted)
                .fetch_all(&mut *conn)
                .await
                .context("Failed to resolve subjects")
                .map_err(AppError::database)?;

        let missing: Vec<&str> = wanted
            .iter()
            .map(String::as_str)
            .filter(|name| !rows.iter().any(|(_, n)| n == name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Subject not found: {}",
                missing.join(", ")
            )));
        }

        Ok(rows.into_iter().map(|(id, _)| id).collect())
    }

    async fn assemble(db: &PgPool, rows: Vec<TeacherRow>) -> Result<Vec<Teacher>, AppError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let class_links: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT tc.teacher_id, c.full_name
            FROM teacher_classes tc
            JOIN class_sections c ON c.id = tc.class_id
            WHERE tc.teacher_id = ANY($1)
            ORDER BY c.full_name
            "#,
        )
        .bind(&ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher classes")
        .map_err(AppError::database)?;

        let subject_links: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT ts.teacher_id, s.name
            FROM teacher_subjects ts
            JOIN subjects s ON s.id = ts.subject_id
            WHERE ts.teacher_id = ANY($1)
            ORDER BY s.name
            "#,
        )
        .bind(&ids)
        .fetch_all(db)
        .await
        .context("Failed to fetch teacher subjects")
        .map_err(AppError::database)?;

        let mut classes: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (teacher_id, key) in class_links {
            classes.entry(teacher_id).or_default().push(key);
        }
        let mut subjects: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (teacher_id, name) in subject_links {
            subjects.entry(teacher_id).or_default().push(name);
        }

        Ok(rows
            .into_iter()
            .map(|row| Teacher {
                classes: classes.remove(&row.id).unwrap_or_default(),
                subjects: subjects.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                sap_id: row.sap_id,
                email: row.email,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
