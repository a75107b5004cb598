//! Admin account provisioning.
//!
//! Admins are never created through the API; they come from here.

use rollcall_core::hash_password;
use rollcall_models::UserRole;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_ADMIN_SAP_ID: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_ADMIN_NAME: &str = "Administrator";

pub struct NewAdmin<'a> {
    pub name: &'a str,
    pub sap_id: &'a str,
    pub email: Option<&'a str>,
    pub password: &'a str,
}

/// Inserts the account unless the SAP ID is taken. Returns `None` on conflict.
async fn insert_admin(
    db: &PgPool,
    admin: &NewAdmin<'_>,
) -> Result<Option<Uuid>, Box<dyn std::error::Error>> {
    let hashed_password = hash_password(admin.password)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, sap_id, password, role, email)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (sap_id) DO NOTHING
         RETURNING id",
    )
    .bind(admin.name)
    .bind(admin.sap_id)
    .bind(&hashed_password)
    .bind(UserRole::Admin)
    .bind(admin.email)
    .fetch_optional(db)
    .await?;

    Ok(id)
}

/// Creates an admin account, failing if the SAP ID already exists.
pub async fn create_admin(
    db: &PgPool,
    admin: &NewAdmin<'_>,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    match insert_admin(db, admin).await? {
        Some(id) => Ok(id),
        None => Err(format!("User with SAP ID {} already exists", admin.sap_id).into()),
    }
}

/// Ensures the default `admin`/`admin` account exists. Returns `true` when it
/// was created by this call.
pub async fn seed_default_admin(db: &PgPool) -> Result<bool, Box<dyn std::error::Error>> {
    let created = insert_admin(
        db,
        &NewAdmin {
            name: DEFAULT_ADMIN_NAME,
            sap_id: DEFAULT_ADMIN_SAP_ID,
            email: None,
            password: DEFAULT_ADMIN_PASSWORD,
        },
    )
    .await?;

    Ok(created.is_some())
}
