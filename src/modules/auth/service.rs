use anyhow::Context;
use rollcall_auth::create_access_token;
use rollcall_config::JwtConfig;
use rollcall_core::{AppError, hash_password, verify_password};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::metrics::{track_login_failure, track_login_success};

use super::model::{ChangePasswordRequest, LoginRequest, LoginResponse, UserProfile, UserRecord};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(sap_id = %dto.sap_id))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE sap_id = $1")
            .bind(dto.sap_id.trim())
            .fetch_optional(db)
            .await
            .context("Failed to fetch user")
            .map_err(AppError::database)?;

        let Some(user) = user else {
            track_login_failure("unknown_user");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&dto.password, &user.password)? {
            track_login_failure("wrong_password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let access_token =
            create_access_token(user.id, &user.sap_id, user.role.as_str(), jwt_config)?;
        let profile = Self::get_profile(db, user.id).await?;

        track_login_success(user.role.as_str());
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user: profile,
        })
    }

    #[instrument(skip(db))]
    pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<UserProfile, AppError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.name, u.sap_id, u.role, u.email, c.full_name AS class_key, u.roll_no
            FROM users u
            LEFT JOIN class_sections c ON c.id = u.class_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch user profile")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        dto: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let current_hash: Option<String> =
            sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch user")
                .map_err(AppError::database)?;

        let current_hash =
            current_hash.ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;

        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(db)
            .await
            .context("Failed to update password")
            .map_err(AppError::database)?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}
