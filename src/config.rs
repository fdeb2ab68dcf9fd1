use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expire_days: i64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Origins allowed to receive responses. Requests without an Origin
    /// header (curl, server-to-server) bypass the check entirely.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: String,
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
}

impl AppConfig {
    /// Collect all configuration from the environment once at startup.
    /// A missing `JWT_SECRET` or `DATABASE_URL` is fatal here, so business
    /// logic never has to consult the environment itself.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            expire_days: std::env::var("JWT_EXPIRE_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let cors = CorsConfig {
            allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]),
        };
        let environment =
            std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Ok(Self {
            database_url,
            environment,
            jwt,
            cors,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
