use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::db::Db;
use crate::services::{lesson, EngineError};

const OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

/// Questions drawn per difficulty band for the diagnostic test.
pub const PLACEMENT_QUESTIONS_PER_LEVEL: i64 = 2;

#[derive(Debug, Clone)]
pub struct CreateQuestionInput {
    pub lesson_id: String,
    pub content: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub difficulty_level: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub lesson_id: String,
    pub content: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub difficulty_level: i64,
    pub created_at: String,
}

/// Question as served to learners: the canonical option is withheld.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPublic {
    pub id: String,
    pub lesson_id: String,
    pub content: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub difficulty_level: i64,
}

impl From<Question> for QuestionPublic {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            lesson_id: q.lesson_id,
            content: q.content,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            difficulty_level: q.difficulty_level,
        }
    }
}

fn validate_input(input: &CreateQuestionInput) -> Result<String, EngineError> {
    if input.content.trim().is_empty() {
        return Err(EngineError::Validation(
            "question content must not be empty".to_string(),
        ));
    }
    for (label, option) in [
        ("optionA", &input.option_a),
        ("optionB", &input.option_b),
        ("optionC", &input.option_c),
        ("optionD", &input.option_d),
    ] {
        if option.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "{label} must not be empty"
            )));
        }
    }

    let correct = input.correct_answer.trim().to_uppercase();
    if !OPTION_KEYS.contains(&correct.as_str()) {
        return Err(EngineError::Validation(
            "correctAnswer must be one of A, B, C, D".to_string(),
        ));
    }

    lesson::validate_difficulty(input.difficulty_level)?;
    Ok(correct)
}

pub async fn create_question(
    db: &Db,
    input: CreateQuestionInput,
) -> Result<Question, EngineError> {
    let correct = validate_input(&input)?;

    if !lesson::lesson_exists(db, &input.lesson_id).await? {
        return Err(EngineError::NotFound(format!(
            "lesson {} does not exist",
            input.lesson_id
        )));
    }

    insert_question(db.pool(), input, correct).await
}

/// Replaces every field of an existing question. Validated like a fresh
/// record; the target lesson must exist.
pub async fn update_question(
    db: &Db,
    question_id: &str,
    input: CreateQuestionInput,
) -> Result<Question, EngineError> {
    let correct = validate_input(&input)?;

    if !lesson::lesson_exists(db, &input.lesson_id).await? {
        return Err(EngineError::NotFound(format!(
            "lesson {} does not exist",
            input.lesson_id
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE "questions"
        SET "lessonId" = $2, "content" = $3, "optionA" = $4, "optionB" = $5,
            "optionC" = $6, "optionD" = $7, "correctAnswer" = $8, "difficultyLevel" = $9
        WHERE "id" = $1
        "#,
    )
    .bind(question_id)
    .bind(&input.lesson_id)
    .bind(&input.content)
    .bind(&input.option_a)
    .bind(&input.option_b)
    .bind(&input.option_c)
    .bind(&input.option_d)
    .bind(&correct)
    .bind(input.difficulty_level)
    .execute(db.pool())
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound(format!(
            "question {question_id} does not exist"
        )));
    }

    get_question(db, question_id).await
}

/// Deletes a question unless the answer log references it. The log is
/// append-only and the source of truth for derived statistics, so a question
/// with recorded attempts cannot be removed.
pub async fn delete_question(db: &Db, question_id: &str) -> Result<(), EngineError> {
    let attempts: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "answer_records" WHERE "questionId" = $1"#,
    )
    .bind(question_id)
    .fetch_one(db.pool())
    .await?;
    if attempts > 0 {
        return Err(EngineError::Conflict(format!(
            "question {question_id} has {attempts} recorded attempts and cannot be deleted"
        )));
    }

    let result = sqlx::query(r#"DELETE FROM "questions" WHERE "id" = $1"#)
        .bind(question_id)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound(format!(
            "question {question_id} does not exist"
        )));
    }

    tracing::info!(question_id, "question deleted");
    Ok(())
}

/// Batch intake of provider-authored question records for one lesson. The
/// provider is opaque; records are validated exactly like hand-written ones
/// and the whole batch is rejected on the first invalid record. The inserts
/// run in one transaction, so a store failure mid-batch leaves nothing
/// behind.
pub async fn import_questions(
    db: &Db,
    lesson_id: &str,
    records: Vec<CreateQuestionInput>,
) -> Result<i64, EngineError> {
    if records.is_empty() {
        return Err(EngineError::Validation(
            "import batch must not be empty".to_string(),
        ));
    }

    if !lesson::lesson_exists(db, lesson_id).await? {
        return Err(EngineError::NotFound(format!(
            "lesson {lesson_id} does not exist"
        )));
    }

    let mut validated = Vec::with_capacity(records.len());
    for mut record in records {
        record.lesson_id = lesson_id.to_string();
        let correct = validate_input(&record)?;
        validated.push((record, correct));
    }

    let count = validated.len() as i64;
    let mut tx = db.pool().begin().await?;
    for (record, correct) in validated {
        insert_question(&mut *tx, record, correct).await?;
    }
    tx.commit().await?;

    tracing::info!(lesson_id, count, "imported provider questions");
    Ok(count)
}

async fn insert_question<'e, E>(
    executor: E,
    input: CreateQuestionInput,
    correct: String,
) -> Result<Question, EngineError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO "questions"
          ("id","lessonId","content","optionA","optionB","optionC","optionD","correctAnswer","difficultyLevel","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        "#,
    )
    .bind(&id)
    .bind(&input.lesson_id)
    .bind(&input.content)
    .bind(&input.option_a)
    .bind(&input.option_b)
    .bind(&input.option_c)
    .bind(&input.option_d)
    .bind(&correct)
    .bind(input.difficulty_level)
    .bind(created_at.naive_utc())
    .execute(executor)
    .await?;

    Ok(Question {
        id,
        lesson_id: input.lesson_id,
        content: input.content,
        option_a: input.option_a,
        option_b: input.option_b,
        option_c: input.option_c,
        option_d: input.option_d,
        correct_answer: correct,
        difficulty_level: input.difficulty_level,
        created_at: crate::services::grading::format_timestamp(created_at),
    })
}

pub async fn get_question(db: &Db, question_id: &str) -> Result<Question, EngineError> {
    let row = sqlx::query(
        r#"
        SELECT "id","lessonId","content","optionA","optionB","optionC","optionD",
               "correctAnswer","difficultyLevel","createdAt"
        FROM "questions"
        WHERE "id" = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Err(EngineError::NotFound(format!(
            "question {question_id} does not exist"
        )));
    };
    question_from_row(&row)
}

pub async fn list_questions_for_lesson(
    db: &Db,
    lesson_id: &str,
) -> Result<Vec<Question>, EngineError> {
    if !lesson::lesson_exists(db, lesson_id).await? {
        return Err(EngineError::NotFound(format!(
            "lesson {lesson_id} does not exist"
        )));
    }

    let rows = sqlx::query(
        r#"
        SELECT "id","lessonId","content","optionA","optionB","optionC","optionD",
               "correctAnswer","difficultyLevel","createdAt"
        FROM "questions"
        WHERE "lessonId" = $1
        ORDER BY "createdAt", "id"
        "#,
    )
    .bind(lesson_id)
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(|row| question_from_row(&row)).collect()
}

/// Draws the diagnostic question set: up to two random questions from each
/// difficulty band (1 to 5), in ascending band order. Bands with fewer
/// questions contribute what they have.
pub async fn placement_test_questions(db: &Db) -> Result<Vec<Question>, EngineError> {
    let mut selected = Vec::new();
    for level in lesson::MIN_DIFFICULTY..=lesson::MAX_DIFFICULTY {
        let rows = sqlx::query(
            r#"
            SELECT "id","lessonId","content","optionA","optionB","optionC","optionD",
                   "correctAnswer","difficultyLevel","createdAt"
            FROM "questions"
            WHERE "difficultyLevel" = $1
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(level)
        .bind(PLACEMENT_QUESTIONS_PER_LEVEL)
        .fetch_all(db.pool())
        .await?;

        for row in rows {
            selected.push(question_from_row(&row)?);
        }
    }
    Ok(selected)
}

fn question_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, EngineError> {
    let created_at: NaiveDateTime = row.try_get("createdAt")?;
    Ok(Question {
        id: row.try_get("id")?,
        lesson_id: row.try_get("lessonId")?,
        content: row.try_get("content")?,
        option_a: row.try_get("optionA")?,
        option_b: row.try_get("optionB")?,
        option_c: row.try_get("optionC")?,
        option_d: row.try_get("optionD")?,
        correct_answer: row.try_get("correctAnswer")?,
        difficulty_level: row.try_get("difficultyLevel")?,
        created_at: crate::services::grading::format_timestamp(
            chrono::DateTime::from_naive_utc_and_offset(created_at, Utc),
        ),
    })
}
