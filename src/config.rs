// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub seed_instructor_email: Option<String>,
    pub seed_instructor_password: Option<String>,
    pub seed_instructor_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            seed_instructor_email: env::var("SEED_INSTRUCTOR_EMAIL").ok(),
            seed_instructor_password: env::var("SEED_INSTRUCTOR_PASSWORD").ok(),
            seed_instructor_name: env::var("SEED_INSTRUCTOR_NAME").ok(),
        }
    }
}
