// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        html::clean_html,
        jwt::sign_jwt,
    },
};

/// Registers a new user and logs them in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a signed token and the granted role.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.role != "instructor" && payload.role != "participant" {
        return Err(AppError::BadRequest(
            "Role must be 'instructor' or 'participant'".to_string(),
        ));
    }

    let name = clean_html(&payload.name);
    let hashed_password = hash_password(&payload.password)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (name, email, password, role, baseline_ability)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.role)
    .bind(payload.baseline_ability)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Email '{}' already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let token = sign_jwt(id, &payload.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "role": payload.role,
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, baseline_ability, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "role": user.role,
    })))
}
