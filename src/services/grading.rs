use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::Db;
use crate::services::progression::{self, LearnerLocks};
use crate::services::EngineError;

#[derive(Debug, Clone)]
pub struct SubmitAnswerInput {
    pub question_id: String,
    pub given_answer: String,
    pub time_spent_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub given_answer: String,
    pub is_correct: bool,
    pub time_spent_seconds: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    #[serde(flatten)]
    pub record: AnswerRecord,
    pub current_level: i64,
}

/// Verdict rule: trimmed, case-insensitive equality against the question's
/// canonical option.
pub fn is_correct_answer(given: &str, correct: &str) -> bool {
    given.trim().to_lowercase() == correct.trim().to_lowercase()
}

/// Grades a submission, appends the answer record, and synchronously
/// recomputes the learner's level under the learner's lock. Elapsed time is
/// stored as given (no clamping). A recompute failure after the insert is
/// logged and the last stored level is returned; the record itself stands.
pub async fn submit_answer(
    db: &Db,
    locks: &LearnerLocks,
    learner_id: &str,
    input: SubmitAnswerInput,
) -> Result<SubmittedAnswer, EngineError> {
    if input.given_answer.trim().is_empty() {
        return Err(EngineError::Validation(
            "givenAnswer must not be empty".to_string(),
        ));
    }
    if input.time_spent_seconds < 0 {
        return Err(EngineError::Validation(
            "timeSpentSeconds must be non-negative".to_string(),
        ));
    }

    let pool = db.pool();

    let stored_level: Option<i64> =
        sqlx::query_scalar(r#"SELECT "currentLevel" FROM "users" WHERE "id" = $1"#)
            .bind(learner_id)
            .fetch_optional(pool)
            .await?;
    let Some(stored_level) = stored_level else {
        return Err(EngineError::NotFound(format!(
            "learner {learner_id} does not exist"
        )));
    };

    let correct_answer: Option<String> =
        sqlx::query_scalar(r#"SELECT "correctAnswer" FROM "questions" WHERE "id" = $1"#)
            .bind(&input.question_id)
            .fetch_optional(pool)
            .await?;
    let Some(correct_answer) = correct_answer else {
        return Err(EngineError::NotFound(format!(
            "question {} does not exist",
            input.question_id
        )));
    };

    let is_correct = is_correct_answer(&input.given_answer, &correct_answer);
    let record_id = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    let lock = locks.lock_for(learner_id);
    let _guard = lock.lock().await;

    sqlx::query(
        r#"
        INSERT INTO "answer_records"
          ("id","userId","questionId","givenAnswer","isCorrect","timeSpentSeconds","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7)
        "#,
    )
    .bind(&record_id)
    .bind(learner_id)
    .bind(&input.question_id)
    .bind(&input.given_answer)
    .bind(is_correct)
    .bind(input.time_spent_seconds)
    .bind(created_at.naive_utc())
    .execute(pool)
    .await?;

    let current_level = match progression::recompute_level(db, learner_id).await {
        Ok(level) => level,
        Err(err) => {
            // Degraded but recorded: the record is the source of truth, so
            // it is kept and the stale level is reported.
            tracing::warn!(error = %err, learner_id, "level recompute failed after record insert");
            stored_level
        }
    };

    Ok(SubmittedAnswer {
        record: AnswerRecord {
            id: record_id,
            user_id: learner_id.to_string(),
            question_id: input.question_id,
            given_answer: input.given_answer,
            is_correct,
            time_spent_seconds: input.time_spent_seconds,
            created_at: format_timestamp(created_at),
        },
        current_level,
    })
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
