use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::db::Db;
use crate::services::EngineError;

pub const MIN_DIFFICULTY: i64 = 1;
pub const MAX_DIFFICULTY: i64 = 5;

#[derive(Debug, Clone)]
pub struct CreateLessonInput {
    pub title: String,
    pub description: Option<String>,
    pub content_text: Option<String>,
    pub difficulty: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content_text: Option<String>,
    pub difficulty: i64,
    pub question_count: i64,
    pub created_at: String,
}

pub fn validate_difficulty(value: i64) -> Result<(), EngineError> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value) {
        return Err(EngineError::Validation(format!(
            "difficulty must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}"
        )));
    }
    Ok(())
}

pub async fn create_lesson(db: &Db, input: CreateLessonInput) -> Result<Lesson, EngineError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(EngineError::Validation(
            "lesson title must not be empty".to_string(),
        ));
    }
    validate_difficulty(input.difficulty)?;

    let pool = db.pool();

    // Titles are the aggregation key for lesson breakdowns, hence unique.
    let existing: Option<String> =
        sqlx::query_scalar(r#"SELECT "id" FROM "lessons" WHERE "title" = $1"#)
            .bind(&title)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(EngineError::Conflict(format!(
            "a lesson titled '{title}' already exists"
        )));
    }

    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO "lessons" ("id","title","description","contentText","difficulty","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6)
        "#,
    )
    .bind(&id)
    .bind(&title)
    .bind(input.description.as_deref())
    .bind(input.content_text.as_deref())
    .bind(input.difficulty)
    .bind(created_at.naive_utc())
    .execute(pool)
    .await?;

    Ok(Lesson {
        id,
        title,
        description: input.description,
        content_text: input.content_text,
        difficulty: input.difficulty,
        question_count: 0,
        created_at: crate::services::grading::format_timestamp(created_at),
    })
}

pub async fn list_lessons(db: &Db) -> Result<Vec<Lesson>, EngineError> {
    let rows = sqlx::query(
        r#"
        SELECT
          l."id", l."title", l."description", l."contentText", l."difficulty", l."createdAt",
          (SELECT COUNT(*) FROM "questions" q WHERE q."lessonId" = l."id") AS "questionCount"
        FROM "lessons" l
        ORDER BY l."title"
        "#,
    )
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(|row| lesson_from_row(&row)).collect()
}

pub async fn get_lesson(db: &Db, lesson_id: &str) -> Result<Lesson, EngineError> {
    let row = sqlx::query(
        r#"
        SELECT
          l."id", l."title", l."description", l."contentText", l."difficulty", l."createdAt",
          (SELECT COUNT(*) FROM "questions" q WHERE q."lessonId" = l."id") AS "questionCount"
        FROM "lessons" l
        WHERE l."id" = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Err(EngineError::NotFound(format!(
            "lesson {lesson_id} does not exist"
        )));
    };
    lesson_from_row(&row)
}

/// Deletes a lesson and its questions in one transaction. Refused while any
/// of its questions has recorded attempts: the answer log is append-only and
/// deleting its referents would orphan it.
pub async fn delete_lesson(db: &Db, lesson_id: &str) -> Result<(), EngineError> {
    if !lesson_exists(db, lesson_id).await? {
        return Err(EngineError::NotFound(format!(
            "lesson {lesson_id} does not exist"
        )));
    }

    let attempts: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM "answer_records" r
        JOIN "questions" q ON q."id" = r."questionId"
        WHERE q."lessonId" = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_one(db.pool())
    .await?;
    if attempts > 0 {
        return Err(EngineError::Conflict(format!(
            "lesson {lesson_id} has {attempts} recorded attempts and cannot be deleted"
        )));
    }

    let mut tx = db.pool().begin().await?;
    sqlx::query(r#"DELETE FROM "questions" WHERE "lessonId" = $1"#)
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(r#"DELETE FROM "lessons" WHERE "id" = $1"#)
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(lesson_id, "lesson and its questions deleted");
    Ok(())
}

pub async fn lesson_exists(db: &Db, lesson_id: &str) -> Result<bool, EngineError> {
    let existing: Option<String> =
        sqlx::query_scalar(r#"SELECT "id" FROM "lessons" WHERE "id" = $1"#)
            .bind(lesson_id)
            .fetch_optional(db.pool())
            .await?;
    Ok(existing.is_some())
}

fn lesson_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, EngineError> {
    let created_at: NaiveDateTime = row.try_get("createdAt")?;
    Ok(Lesson {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        content_text: row.try_get("contentText")?,
        difficulty: row.try_get("difficulty")?,
        question_count: row.try_get("questionCount")?,
        created_at: crate::services::grading::format_timestamp(
            chrono::DateTime::from_naive_utc_and_offset(created_at, Utc),
        ),
    })
}
