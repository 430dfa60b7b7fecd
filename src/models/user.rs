// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Display name shown in statistics and cohort listings.
    pub name: String,

    /// Unique login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'instructor' or 'participant'.
    pub role: String,

    /// External ability metric, used as an alternative ranking score when
    /// partitioning cohorts. Absent for most users.
    pub baseline_ability: Option<f64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    /// 'instructor' or 'participant'; checked in the handler.
    pub role: String,
    pub baseline_ability: Option<f64>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
