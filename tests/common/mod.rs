#![allow(dead_code)]

use chrono::Utc;
use uuid::Uuid;

use mastery_backend::db::Db;
use mastery_backend::services::lesson::{self, CreateLessonInput};
use mastery_backend::services::placement::PlacementTable;
use mastery_backend::services::question::{self, CreateQuestionInput};
use mastery_backend::state::AppState;

pub async fn create_test_state() -> AppState {
    let db = Db::in_memory().await.expect("in-memory db init");
    AppState::new(db, PlacementTable::default())
}

pub async fn create_test_app() -> axum::Router {
    mastery_backend::create_app(create_test_state().await)
}

/// Inserts a user directly; account registration is exercised separately at
/// the HTTP level.
pub async fn insert_user(db: &Db, username: &str, role: &str) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO "users" ("id","username","email","passwordHash","role","createdAt")
        VALUES ($1,$2,$3,'',$4,$5)
        "#,
    )
    .bind(&id)
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind(role)
    .bind(Utc::now().naive_utc())
    .execute(db.pool())
    .await
    .expect("insert user");
    id
}

pub async fn insert_lesson(db: &Db, title: &str) -> String {
    lesson::create_lesson(
        db,
        CreateLessonInput {
            title: title.to_string(),
            description: None,
            content_text: None,
            difficulty: 3,
        },
    )
    .await
    .expect("create lesson")
    .id
}

pub async fn insert_question(db: &Db, lesson_id: &str, correct: &str, difficulty: i64) -> String {
    question::create_question(
        db,
        CreateQuestionInput {
            lesson_id: lesson_id.to_string(),
            content: "placeholder question".to_string(),
            option_a: "alpha".to_string(),
            option_b: "beta".to_string(),
            option_c: "gamma".to_string(),
            option_d: "delta".to_string(),
            correct_answer: correct.to_string(),
            difficulty_level: difficulty,
        },
    )
    .await
    .expect("create question")
    .id
}
