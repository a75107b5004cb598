use std::collections::HashMap;

use anyhow::Context;
use rollcall_core::AppError;
use rollcall_db::{is_foreign_key_violation, is_unique_violation};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::model::{ClassSection, CreateClassDto, UpdateClassDto, class_key};

pub struct ClassService;

impl ClassService {
    #[instrument(skip(db, dto))]
    pub async fn create_class(db: &PgPool, dto: CreateClassDto) -> Result<ClassSection, AppError> {
        let key = dto.key();

        let class = sqlx::query_as::<_, ClassSection>(
            r#"
            INSERT INTO class_sections (year, name, batch, num_students, full_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(dto.year.trim())
        .bind(dto.name.trim())
        .bind(dto.batch)
        .bind(dto.num_students)
        .bind(&key)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::bad_request(anyhow::anyhow!("Class {} already exists", key));
            }
            AppError::database(anyhow::Error::from(e).context("Failed to create class"))
        })?;

        tracing::info!(class_key = %class.full_name, "Class created");
        Ok(class)
    }

    #[instrument(skip(db))]
    pub async fn list_classes(db: &PgPool) -> Result<Vec<ClassSection>, AppError> {
        sqlx::query_as::<_, ClassSection>("SELECT * FROM class_sections ORDER BY full_name")
            .fetch_all(db)
            .await
            .context("Failed to fetch classes")
            .map_err(AppError::database)
    }

    #[instrument(skip(db))]
    pub async fn get_class(db: &PgPool, key: &str) -> Result<ClassSection, AppError> {
        sqlx::query_as::<_, ClassSection>("SELECT * FROM class_sections WHERE full_name = $1")
            .bind(key)
            .fetch_optional(db)
            .await
            .context("Failed to fetch class")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Class {} not found", key)))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_class(
        db: &PgPool,
        key: &str,
        dto: UpdateClassDto,
    ) -> Result<ClassSection, AppError> {
        let existing = Self::get_class(db, key).await?;

        let year = dto.year.unwrap_or(existing.year);
        let name = dto.name.unwrap_or(existing.name);
        let batch = dto.batch.unwrap_or(existing.batch);
        let num_students = dto.num_students.unwrap_or(existing.num_students);
        let new_key = class_key(&year, &name, batch);

        sqlx::query_as::<_, ClassSection>(
            r#"
            UPDATE class_sections
            SET year = $1, name = $2, batch = $3, num_students = $4, full_name = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(year.trim())
        .bind(name.trim())
        .bind(batch)
        .bind(num_students)
        .bind(&new_key)
        .bind(existing.id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::bad_request(anyhow::anyhow!("Class {} already exists", new_key));
            }
            AppError::database(anyhow::Error::from(e).context("Failed to update class"))
        })
    }

    #[instrument(skip(db))]
    pub async fn delete_class(db: &PgPool, key: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM class_sections WHERE full_name = $1")
            .bind(key)
            .execute(db)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::bad_request(anyhow::anyhow!(
                        "Class {} still has students or subjects",
                        key
                    ));
                }
                AppError::database(anyhow::Error::from(e).context("Failed to delete class"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Class {} not found", key)));
        }

        Ok(())
    }

    /// Resolves class keys to ids, in request order. Unknown keys are a 400.
    pub async fn resolve_keys(
        conn: &mut PgConnection,
        keys: &[String],
    ) -> Result<Vec<(Uuid, String)>, AppError> {
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys.iter().map(|k| k.trim()) {
            if !unique.iter().any(|k| k == key) {
                unique.push(key.to_string());
            }
        }

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, full_name FROM class_sections WHERE full_name = ANY($1)")
                .bind(&unique)
                .fetch_all(&mut *conn)
                .await
                .context("Failed to resolve classes")
                .map_err(AppError::database)?;

        let by_key: HashMap<&str, Uuid> = rows.iter().map(|(id, k)| (k.as_str(), *id)).collect();

        let missing: Vec<&str> = unique
            .iter()
            .map(String::as_str)
            .filter(|k| !by_key.contains_key(k))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Class not found: {}",
                missing.join(", ")
            )));
        }

        Ok(unique
            .iter()
            .map(|k| (by_key[k.as_str()], k.clone()))
            .collect())
    }
}
