// tests/api_tests.rs

use cohort_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345"), or None when no
/// test database is configured, in which case the test is skipped.
async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        seed_instructor_email: None,
        seed_instructor_password: None,
        seed_instructor_name: None,
    };

    let state = AppState { pool, config };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

/// Registers a fresh user with a unique email; returns the bearer token.
async fn register(client: &reqwest::Client, address: &str, name: &str, role: &str) -> String {
    let email = format!("u_{}@test.dev", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": name,
            "email": email,
            "password": "password123",
            "role": role,
        }))
        .send()
        .await
        .expect("Register failed");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.expect("Register body not JSON");
    body["token"].as_str().expect("Token missing").to_string()
}

/// Creates an assessment whose every question has correct_option = 0.
async fn create_assessment(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    num_questions: usize,
) -> i64 {
    let questions: Vec<serde_json::Value> = (0..num_questions)
        .map(|i| {
            serde_json::json!({
                "text": format!("Question {}", i + 1),
                "options": ["Alpha", "Beta", "Gamma", "Delta"],
                "correct_option": 0,
            })
        })
        .collect();

    let response = client
        .post(format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Integration assessment",
            "questions": questions,
        }))
        .send()
        .await
        .expect("Create assessment failed");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("Assessment id missing")
}

/// Submits an attempt with the given selected options.
async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    assessment_id: i64,
    selections: &[i64],
) -> reqwest::Response {
    let answers: Vec<serde_json::Value> = selections
        .iter()
        .map(|s| serde_json::json!({"selected_option": s}))
        .collect();

    client
        .post(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "assessment_id": assessment_id,
            "answers": answers,
        }))
        .send()
        .await
        .expect("Submit failed")
}

#[tokio::test]
async fn health_check_404() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_and_login_round_trip() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = format!("u_{}@test.dev", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Round Trip",
            "email": email,
            "password": "password123",
            "role": "participant",
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "participant");
    assert!(body["token"].as_str().is_some());

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123",
        }))
        .send()
        .await
        .expect("Login failed");
    assert_eq!(login.status().as_u16(), 200);
    let body: serde_json::Value = login.json().await.unwrap();
    assert_eq!(body["role"], "participant");
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = format!("u_{}@test.dev", &uuid::Uuid::new_v4().to_string()[..8]);

    let payload = serde_json::json!({
        "name": "First",
        "email": email,
        "password": "password123",
        "role": "participant",
    });

    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn register_rejects_unknown_role() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Bad Role",
            "email": format!("u_{}@test.dev", &uuid::Uuid::new_v4().to_string()[..8]),
            "password": "password123",
            "role": "superuser",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn participant_cannot_create_assessment() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register(&client, &address, "Student", "participant").await;

    let response = client
        .post(format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Should fail",
            "questions": [{
                "text": "Q",
                "options": ["A", "B", "C", "D"],
                "correct_option": 0,
            }],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn assessment_rejects_wrong_option_count() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register(&client, &address, "Teacher", "instructor").await;

    let response = client
        .post(format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Five options",
            "questions": [{
                "text": "Q",
                "options": ["A", "B", "C", "D", "E"],
                "correct_option": 0,
            }],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn participant_view_hides_correct_option() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let instructor = register(&client, &address, "Teacher", "instructor").await;
    let participant = register(&client, &address, "Student", "participant").await;
    let assessment_id = create_assessment(&client, &address, &instructor, 2).await;

    let response = client
        .get(format!("{}/api/assessments/{}", address, assessment_id))
        .header("Authorization", format!("Bearer {}", participant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    for q in body["questions"].as_array().unwrap() {
        assert!(q.get("correct_option").is_none());
    }

    // The instructor view keeps the answer key.
    let response = client
        .get(format!("{}/api/assessments/{}", address, assessment_id))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["questions"][0]["correct_option"], 0);
}

#[tokio::test]
async fn submit_scores_attempt_with_exact_rounding() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let instructor = register(&client, &address, "Teacher", "instructor").await;
    let participant = register(&client, &address, "Student", "participant").await;
    let assessment_id = create_assessment(&client, &address, &instructor, 3).await;

    // Two of three correct: 2/3 rounds half-up to 67.
    let response = submit(&client, &address, &participant, assessment_id, &[0, 0, 1]).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["percentage"], 67);
}

#[tokio::test]
async fn duplicate_submit_conflicts() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let instructor = register(&client, &address, "Teacher", "instructor").await;
    let participant = register(&client, &address, "Student", "participant").await;
    let assessment_id = create_assessment(&client, &address, &instructor, 2).await;

    let first = submit(&client, &address, &participant, assessment_id, &[0, 0]).await;
    assert_eq!(first.status().as_u16(), 201);

    let second = submit(&client, &address, &participant, assessment_id, &[1, 1]).await;
    assert_eq!(second.status().as_u16(), 409);

    // Exactly one attempt stored.
    let attempts = client
        .get(format!("{}/api/attempts/{}", address, assessment_id))
        .header("Authorization", format!("Bearer {}", instructor))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = attempts.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["score"], 2);
}

#[tokio::test]
async fn submit_length_mismatch_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let instructor = register(&client, &address, "Teacher", "instructor").await;
    let participant = register(&client, &address, "Student", "participant").await;
    let assessment_id = create_assessment(&client, &address, &instructor, 3).await;

    let response = submit(&client, &address, &participant, assessment_id, &[0, 0]).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn submit_malformed_answer_item_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let instructor = register(&client, &address, "Teacher", "instructor").await;
    let participant = register(&client, &address, "Student", "participant").await;
    let assessment_id = create_assessment(&client, &address, &instructor, 1).await;

    // An extra field on the answer item must be rejected, not coerced.
    let response = client
        .post(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", participant))
        .json(&serde_json::json!({
            "assessment_id": assessment_id,
            "answers": [{"selected_option": 0, "is_correct": true}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Bare option indices are rejected too.
    let response = client
        .post(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", participant))
        .json(&serde_json::json!({
            "assessment_id": assessment_id,
            "answers": [2],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn submit_unknown_assessment_not_found() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let participant = register(&client, &address, "Student", "participant").await;

    let response = submit(&client, &address, &participant, 999_999_999, &[0]).await;
    assert_eq!(response.status().as_u16(), 404);
}
