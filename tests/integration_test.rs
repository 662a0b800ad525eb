use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body")
}

async fn send_json(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Value) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn send_get(app: &Router, uri: &str, token: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Registers an account through the API and returns its token.
async fn register(app: &Router, username: &str, role: &str) -> String {
    let response = send_json(
        app,
        "POST",
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2-long-enough",
            "role": role,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_live_and_ready() {
    let app = common::create_test_app().await;

    let response = send_get(&app, "/health/live", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_get(&app, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_404_not_found() {
    let app = common::create_test_app().await;

    let response = send_get(&app, "/nonexistent/path", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unauthorized_without_token() {
    let app = common::create_test_app().await;

    for uri in [
        "/api/learning/summary",
        "/api/learning/trend",
        "/api/learning/recommendation",
        "/api/lessons",
        "/api/analytics/cohort",
    ] {
        let response = send_get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_register_login_me() {
    let app = common::create_test_app().await;

    let token = register(&app, "ada", "student").await;

    let response = send_get(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "ada");
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["currentLevel"], 1);
    assert_eq!(body["data"]["isPlacementCompleted"], false);

    // duplicate registration
    let response = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "hunter2-long-enough",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // wrong password
    let response = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        json!({"email": "ada@example.com", "password": "wrong-password"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        json!({"email": "ada@example.com", "password": "hunter2-long-enough"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn test_register_rejects_short_password_and_bad_email() {
    let app = common::create_test_app().await;

    let response = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({"username": "x", "email": "x@example.com", "password": "short"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({"username": "x", "email": "not-an-email", "password": "hunter2-long-enough"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_students_cannot_author_content() {
    let app = common::create_test_app().await;
    let token = register(&app, "student1", "student").await;

    let response = send_json(
        &app,
        "POST",
        "/api/lessons",
        Some(&token),
        json!({"title": "Algebra"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_get(&app, "/api/analytics/cohort", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(
        &app,
        "PUT",
        "/api/questions/some-id",
        Some(&token),
        json!({
            "lessonId": "some-lesson",
            "content": "x",
            "optionA": "1", "optionB": "2", "optionC": "3", "optionD": "4",
            "correctAnswer": "A",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(&app, "DELETE", "/api/questions/some-id", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(&app, "DELETE", "/api/lessons/some-id", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_authoring_submission_and_summary_flow() {
    let app = common::create_test_app().await;
    let teacher = register(&app, "prof", "teacher").await;
    let student = register(&app, "ada", "student").await;

    let response = send_json(
        &app,
        "POST",
        "/api/lessons",
        Some(&teacher),
        json!({"title": "Algebra", "difficulty": 2}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let lesson_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send_json(
        &app,
        "POST",
        "/api/questions",
        Some(&teacher),
        json!({
            "lessonId": lesson_id,
            "content": "2 + 2 = ?",
            "optionA": "3",
            "optionB": "4",
            "optionC": "5",
            "optionD": "22",
            "correctAnswer": "b",
            "difficultyLevel": 1,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let question = body_json(response).await;
    // authors see the canonical answer, normalized to upper case
    assert_eq!(question["data"]["correctAnswer"], "B");
    let question_id = question["data"]["id"].as_str().unwrap().to_string();

    // answers are redacted on the student-facing listing
    let response = send_get(
        &app,
        &format!("/api/lessons/{lesson_id}/questions"),
        Some(&student),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert!(listing["data"][0].get("correctAnswer").is_none());

    // cold start: no records yet
    let response = send_get(&app, "/api/learning/recommendation", Some(&student)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rec = body_json(response).await;
    assert_eq!(rec["data"]["action"], "Start Diagnostic");
    assert_eq!(rec["data"]["priority"], "high");
    assert!(rec["data"]["targetLesson"].is_null());

    let response = send_json(
        &app,
        "POST",
        "/api/learning/submit",
        Some(&student),
        json!({"questionId": question_id, "givenAnswer": " B ", "timeSpentSeconds": 12}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let submitted = body_json(response).await;
    assert_eq!(submitted["data"]["isCorrect"], true);
    assert_eq!(submitted["data"]["currentLevel"], 1);

    let response = send_get(&app, "/api/learning/summary", Some(&student)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["data"]["totalStats"]["totalSolved"], 1);
    assert_eq!(summary["data"]["lessonBreakdown"]["Algebra"]["correct"], 1);

    let response = send_get(&app, "/api/learning/trend", Some(&student)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let trend = body_json(response).await;
    assert_eq!(trend["data"][0]["score"], 100);
    assert_eq!(trend["data"][0]["lesson"], "Algebra");

    let response = send_get(&app, "/api/analytics/cohort", Some(&teacher)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cohort = body_json(response).await;
    assert_eq!(cohort["data"]["totalStudents"], 2);
}

#[tokio::test]
async fn test_import_is_all_or_nothing() {
    let app = common::create_test_app().await;
    let teacher = register(&app, "prof", "teacher").await;

    let response = send_json(
        &app,
        "POST",
        "/api/lessons",
        Some(&teacher),
        json!({"title": "Geometry"}),
    )
    .await;
    let lesson_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let good = json!({
        "content": "How many sides does a triangle have?",
        "optionA": "2", "optionB": "3", "optionC": "4", "optionD": "5",
        "correctAnswer": "B",
    });
    let bad = json!({
        "content": "Broken record",
        "optionA": "1", "optionB": "2", "optionC": "3", "optionD": "4",
        "correctAnswer": "E",
    });

    // one invalid record rejects the whole batch
    let response = send_json(
        &app,
        "POST",
        "/api/questions/import",
        Some(&teacher),
        json!({"lessonId": lesson_id, "questions": [good, bad]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_get(
        &app,
        &format!("/api/lessons/{lesson_id}/questions"),
        Some(&teacher),
    )
    .await;
    let listing = body_json(response).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 0);

    let good_again = json!({
        "content": "How many sides does a triangle have?",
        "optionA": "2", "optionB": "3", "optionC": "4", "optionD": "5",
        "correctAnswer": "B",
    });
    let response = send_json(
        &app,
        "POST",
        "/api/questions/import",
        Some(&teacher),
        json!({"lessonId": lesson_id, "questions": [good_again]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["imported"], 1);
}

#[tokio::test]
async fn test_submit_unknown_question_is_404() {
    let app = common::create_test_app().await;
    let student = register(&app, "ada", "student").await;

    let response = send_json(
        &app,
        "POST",
        "/api/learning/submit",
        Some(&student),
        json!({"questionId": "nope", "givenAnswer": "A", "timeSpentSeconds": 1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_placement_test_serves_diagnostic_questions() {
    let app = common::create_test_app().await;
    let teacher = register(&app, "prof", "teacher").await;
    let student = register(&app, "ada", "student").await;

    let response = send_get(&app, "/api/questions/placement-test", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_json(
        &app,
        "POST",
        "/api/lessons",
        Some(&teacher),
        json!({"title": "Algebra"}),
    )
    .await;
    let lesson_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // three questions per band, five bands
    let mut batch = Vec::new();
    for level in 1..=5 {
        for n in 0..3 {
            batch.push(json!({
                "content": format!("band {level} question {n}"),
                "optionA": "1", "optionB": "2", "optionC": "3", "optionD": "4",
                "correctAnswer": "A",
                "difficultyLevel": level,
            }));
        }
    }
    let response = send_json(
        &app,
        "POST",
        "/api/questions/import",
        Some(&teacher),
        json!({"lessonId": lesson_id, "questions": batch}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send_get(&app, "/api/questions/placement-test", Some(&student)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let drawn = body["data"].as_array().expect("question list");

    // two per band, ascending band order, self-graded so answers included
    assert_eq!(drawn.len(), 10);
    for (index, q) in drawn.iter().enumerate() {
        assert_eq!(q["difficultyLevel"], 1 + index as i64 / 2);
        assert_eq!(q["correctAnswer"], "A");
    }
}

#[tokio::test]
async fn test_teacher_updates_and_deletes_content() {
    let app = common::create_test_app().await;
    let teacher = register(&app, "prof", "teacher").await;

    let response = send_json(
        &app,
        "POST",
        "/api/lessons",
        Some(&teacher),
        json!({"title": "Chemistry"}),
    )
    .await;
    let lesson_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send_json(
        &app,
        "POST",
        "/api/questions",
        Some(&teacher),
        json!({
            "lessonId": lesson_id,
            "content": "H2O is?",
            "optionA": "water", "optionB": "salt", "optionC": "air", "optionD": "gold",
            "correctAnswer": "A",
        }),
    )
    .await;
    let question_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/questions/{question_id}"),
        Some(&teacher),
        json!({
            "lessonId": lesson_id,
            "content": "NaCl is?",
            "optionA": "water", "optionB": "salt", "optionC": "air", "optionD": "gold",
            "correctAnswer": "b",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["content"], "NaCl is?");
    assert_eq!(body["data"]["correctAnswer"], "B");

    let response = send_json(
        &app,
        "DELETE",
        &format!("/api/questions/{question_id}"),
        Some(&teacher),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_get(&app, &format!("/api/questions/{question_id}"), Some(&teacher)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_json(
        &app,
        "DELETE",
        &format!("/api/lessons/{lesson_id}"),
        Some(&teacher),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_get(&app, &format!("/api/lessons/{lesson_id}"), Some(&teacher)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_placement_completion() {
    let app = common::create_test_app().await;
    let student = register(&app, "ada", "student").await;

    let response = send_json(
        &app,
        "POST",
        "/api/placement/complete",
        Some(&student),
        json!({"score": 6}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["newLevel"], 3);
    assert_eq!(body["data"]["isPlacementCompleted"], true);

    let response = send_get(&app, "/api/auth/me", Some(&student)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["currentLevel"], 3);
    assert_eq!(body["data"]["isPlacementCompleted"], true);

    let response = send_json(
        &app,
        "POST",
        "/api/placement/complete",
        Some(&student),
        json!({"score": -1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
