// src/routes.rs

use std::time::Duration;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, attempt, auth, cohort, statistics},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, assessments, attempts, cohorts).
/// * Applies global middleware (Trace, Timeout, CORS).
/// * Injects global state (pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Reads open to any authenticated caller; authoring and statistics are
    // instructor-gated.
    let assessment_routes = Router::new()
        .route("/", get(assessment::list_assessments))
        .route("/{id}", get(assessment::get_assessment))
        .merge(
            Router::new()
                .route("/", post(assessment::create_assessment))
                .route("/my", get(assessment::list_my_assessments))
                .route("/{id}/statistics", get(statistics::get_statistics))
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/", post(attempt::submit_attempt))
        .merge(
            Router::new()
                .route("/{assessment_id}", get(attempt::list_attempts))
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cohort_routes = Router::new()
        .route("/partition", post(cohort::partition_cohorts))
        .route("/{assessment_id}", get(cohort::get_cohorts))
        // Double middleware protection: Auth first, then instructor check
        .layer(middleware::from_fn(instructor_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/cohorts", cohort_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(15)))
        .layer(cors)
        .with_state(state)
}
