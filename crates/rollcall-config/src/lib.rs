//! # Rollcall Config
//!
//! Configuration structures loaded from environment variables. Each type has a
//! `from_env()` constructor that falls back to development defaults.
//!
//! - [`jwt`]: token signing secret and lifetime
//! - [`cors`]: allowed browser origins
//! - [`email`]: SMTP settings for ticket notifications
//! - [`rate_limit`]: login throttling
//! - [`upload`]: attachment directory and size cap
//! - [`server`]: listen ports
//!
//! ```ignore
//! use rollcall_config::{JwtConfig, CorsConfig, EmailConfig, RateLimitConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let rate_limit_config = RateLimitConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod rate_limit;
pub mod server;
pub mod upload;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;
pub use upload::UploadConfig;

/// Reads an environment variable and parses it, falling back to `default`.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}
