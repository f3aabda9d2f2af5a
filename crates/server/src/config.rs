use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub body_limit_bytes: usize,
    pub static_dir: String,
    pub seed: SeedConfig,
}

/// Accounts created by `voiceup-server seed`.
#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub citizen_email: String,
    pub citizen_password: String,
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: string("DATABASE_URL", "sqlite:./data/voiceup.db?mode=rwc"),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5),
            jwt_secret: string("JWT_SECRET", "development-secret-change-in-production"),
            token_ttl_days: parsed("TOKEN_TTL_DAYS", 7),
            // Reports carry photos and voice notes inline as data URLs
            body_limit_bytes: parsed("BODY_LIMIT_BYTES", 50 * 1024 * 1024),
            static_dir: string("STATIC_DIR", "static"),
            seed: SeedConfig::from_env(),
        }
    }
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self {
            admin_email: string("SEED_ADMIN_EMAIL", "admin@voiceup.com"),
            admin_password: string("SEED_ADMIN_PASSWORD", "admin123"),
            citizen_email: string("SEED_CITIZEN_EMAIL", "user@example.com"),
            citizen_password: string("SEED_CITIZEN_PASSWORD", "user123"),
        }
    }
}
