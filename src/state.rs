use std::sync::Arc;

use anyhow::Context;
use rollcall_config::{
    CorsConfig, EmailConfig, JwtConfig, RateLimitConfig, ServerConfig, UploadConfig,
};
use rollcall_core::file_storage::{FileStorage, LocalFileStorage};
use rollcall_db::init_db_pool;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub upload_config: UploadConfig,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        email_config: EmailConfig,
        cors_config: CorsConfig,
        rate_limit_config: RateLimitConfig,
        upload_config: UploadConfig,
    ) -> Self {
        let storage = Arc::new(LocalFileStorage::new(
            upload_config.dir.clone(),
            upload_config.max_bytes,
        ));

        Self {
            db,
            jwt_config,
            email_config,
            cors_config,
            rate_limit_config,
            upload_config,
            storage,
        }
    }

    /// State with email and rate limiting off and uploads in a throwaway directory.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_tests(db: PgPool) -> Self {
        let upload_config = UploadConfig {
            dir: std::env::temp_dir().join(format!("rollcall-uploads-{}", uuid::Uuid::new_v4())),
            max_bytes: rollcall_config::upload::DEFAULT_MAX_UPLOAD_BYTES,
        };

        Self::new(
            db,
            JwtConfig {
                secret: "test-secret".to_string(),
                access_token_expiry: 3600,
            },
            EmailConfig::disabled(),
            CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            RateLimitConfig::disabled(),
            upload_config,
        )
    }
}

pub async fn init_app_state(server_config: &ServerConfig) -> anyhow::Result<AppState> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = init_db_pool(&database_url, server_config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    Ok(AppState::new(
        db,
        JwtConfig::from_env(),
        EmailConfig::from_env(),
        CorsConfig::from_env(),
        RateLimitConfig::from_env(),
        UploadConfig::from_env(),
    ))
}
