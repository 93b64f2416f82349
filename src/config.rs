use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config("JWT_SECRET empty".into()));
        }

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
        })
    }

    /// Fixed configuration for tests; never read from the environment.
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
        }
    }
}
