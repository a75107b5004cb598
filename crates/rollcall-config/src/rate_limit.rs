//! Login rate limiting.
//!
//! - `RATE_LIMIT_ENABLED`: turn the limiter on or off (default: on)
//! - `RATE_LIMIT_AUTH_PER_SECOND`: seconds between token replenishments (default: 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: bucket size per client IP (default: 5)
//!
//! The limiter keys on the client IP taken from `X-Forwarded-For` / `X-Real-IP`
//! when present and the peer address otherwise, so the server must be served
//! with connect info.

use governor::middleware::NoOpMiddleware;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

use crate::{env_flag, env_or};

pub type AuthGovernorConfig = GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Governor config for the login route, or `None` when limiting is off or
    /// the configured values are zero.
    #[must_use]
    pub fn auth_governor_config(&self) -> Option<AuthGovernorConfig> {
        if !self.enabled {
            return None;
        }

        GovernorConfigBuilder::default()
            .per_second(self.auth_per_second)
            .burst_size(self.auth_burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
    }
}
