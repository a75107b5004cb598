use crate::env_or;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub database_max_connections: u32,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 5000),
            metrics_port: env_or("METRICS_PORT", 9000),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
        }
    }
}
