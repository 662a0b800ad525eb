use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::Row;

use crate::db::Db;
use crate::services::EngineError;

pub const TREND_CAP: i64 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStat {
    pub correct: i64,
    pub total: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStat {
    pub correct: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub total_solved: i64,
    pub total_correct: i64,
    pub accuracy: f64,
    pub avg_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSummary {
    pub lesson_breakdown: BTreeMap<String, LessonStat>,
    pub difficulty_breakdown: BTreeMap<i64, DifficultyStat>,
    pub total_stats: TotalStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: String,
    pub lesson: String,
    pub score: i64,
    pub difficulty: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub accuracy: i64,
    pub total_xp: i64,
    pub total_solved: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPerformance {
    pub id: String,
    pub name: String,
    pub pass_rate: i64,
    pub total_questions: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortAnalytics {
    pub students: Vec<StudentSummary>,
    pub lessons: Vec<LessonPerformance>,
    pub total_students: i64,
}

/// Success rate per lesson title for one learner. Keyed by title in a
/// BTreeMap, so enumeration order is lexicographic; the recommendation
/// tie-break relies on that order being deterministic.
pub async fn lesson_breakdown(
    db: &Db,
    learner_id: &str,
) -> Result<BTreeMap<String, LessonStat>, EngineError> {
    let rows = sqlx::query(
        r#"
        SELECT
          l."title" AS "title",
          COALESCE(SUM(CASE WHEN r."isCorrect" = 1 THEN 1 ELSE 0 END), 0) AS "correctCount",
          COUNT(*) AS "totalCount"
        FROM "answer_records" r
        JOIN "questions" q ON q."id" = r."questionId"
        JOIN "lessons" l ON l."id" = q."lessonId"
        WHERE r."userId" = $1
        GROUP BY l."title"
        "#,
    )
    .bind(learner_id)
    .fetch_all(db.pool())
    .await?;

    let mut breakdown = BTreeMap::new();
    for row in rows {
        let title: String = row.try_get("title")?;
        let correct: i64 = row.try_get("correctCount")?;
        let total: i64 = row.try_get("totalCount")?;
        breakdown.insert(
            title,
            LessonStat {
                correct,
                total,
                success_rate: percentage(correct, total),
            },
        );
    }
    Ok(breakdown)
}

/// Correct/total counts per difficulty rating (1-5).
pub async fn difficulty_breakdown(
    db: &Db,
    learner_id: &str,
) -> Result<BTreeMap<i64, DifficultyStat>, EngineError> {
    let rows = sqlx::query(
        r#"
        SELECT
          q."difficultyLevel" AS "difficulty",
          COALESCE(SUM(CASE WHEN r."isCorrect" = 1 THEN 1 ELSE 0 END), 0) AS "correctCount",
          COUNT(*) AS "totalCount"
        FROM "answer_records" r
        JOIN "questions" q ON q."id" = r."questionId"
        WHERE r."userId" = $1
        GROUP BY q."difficultyLevel"
        "#,
    )
    .bind(learner_id)
    .fetch_all(db.pool())
    .await?;

    let mut breakdown = BTreeMap::new();
    for row in rows {
        let difficulty: i64 = row.try_get("difficulty")?;
        let correct: i64 = row.try_get("correctCount")?;
        let total: i64 = row.try_get("totalCount")?;
        breakdown.insert(difficulty, DifficultyStat { correct, total });
    }
    Ok(breakdown)
}

/// Totals over the learner's whole history. Average time is 0 when no
/// records exist.
pub async fn total_stats(db: &Db, learner_id: &str) -> Result<TotalStats, EngineError> {
    let row = sqlx::query(
        r#"
        SELECT
          COUNT(*) AS "totalCount",
          COALESCE(SUM(CASE WHEN "isCorrect" = 1 THEN 1 ELSE 0 END), 0) AS "correctCount",
          COALESCE(SUM("timeSpentSeconds"), 0) AS "totalSeconds"
        FROM "answer_records"
        WHERE "userId" = $1
        "#,
    )
    .bind(learner_id)
    .fetch_one(db.pool())
    .await?;

    let total: i64 = row.try_get("totalCount")?;
    let correct: i64 = row.try_get("correctCount")?;
    let total_seconds: i64 = row.try_get("totalSeconds")?;

    let avg_time_seconds = if total > 0 {
        total_seconds as f64 / total as f64
    } else {
        0.0
    };

    Ok(TotalStats {
        total_solved: total,
        total_correct: correct,
        accuracy: percentage(correct, total),
        avg_time_seconds,
    })
}

pub async fn learner_summary(db: &Db, learner_id: &str) -> Result<LearnerSummary, EngineError> {
    Ok(LearnerSummary {
        lesson_breakdown: lesson_breakdown(db, learner_id).await?,
        difficulty_breakdown: difficulty_breakdown(db, learner_id).await?,
        total_stats: total_stats(db, learner_id).await?,
    })
}

/// The most recent records (capped), returned in ascending chronological
/// order with each reduced to a plot point.
pub async fn learner_trend(db: &Db, learner_id: &str) -> Result<Vec<TrendPoint>, EngineError> {
    let rows = sqlx::query(
        r#"
        SELECT
          r."createdAt" AS "createdAt",
          r."isCorrect" AS "isCorrect",
          l."title" AS "title",
          q."difficultyLevel" AS "difficulty"
        FROM "answer_records" r
        JOIN "questions" q ON q."id" = r."questionId"
        JOIN "lessons" l ON l."id" = q."lessonId"
        WHERE r."userId" = $1
        ORDER BY r."createdAt" DESC, r."id" DESC
        LIMIT $2
        "#,
    )
    .bind(learner_id)
    .bind(TREND_CAP)
    .fetch_all(db.pool())
    .await?;

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: NaiveDateTime = row.try_get("createdAt")?;
        let is_correct: bool = row.try_get("isCorrect")?;
        let title: String = row.try_get("title")?;
        let difficulty: i64 = row.try_get("difficulty")?;
        points.push(TrendPoint {
            timestamp: crate::services::grading::format_timestamp(
                chrono::DateTime::from_naive_utc_and_offset(created_at, chrono::Utc),
            ),
            lesson: title,
            score: if is_correct { 100 } else { 0 },
            difficulty,
        });
    }

    points.reverse();
    Ok(points)
}

/// Teacher view over every student account and every lesson.
pub async fn cohort_analytics(db: &Db) -> Result<CohortAnalytics, EngineError> {
    let pool = db.pool();

    let student_rows = sqlx::query(
        r#"
        SELECT
          u."id" AS "id",
          u."username" AS "username",
          u."email" AS "email",
          COUNT(r."id") AS "totalCount",
          COALESCE(SUM(CASE WHEN r."isCorrect" = 1 THEN 1 ELSE 0 END), 0) AS "correctCount"
        FROM "users" u
        LEFT JOIN "answer_records" r ON r."userId" = u."id"
        WHERE u."role" = 'student'
        GROUP BY u."id"
        ORDER BY u."username"
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut students = Vec::with_capacity(student_rows.len());
    for row in student_rows {
        let total: i64 = row.try_get("totalCount")?;
        let correct: i64 = row.try_get("correctCount")?;
        students.push(StudentSummary {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            // truncated, not rounded: 2/3 correct reports 66
            accuracy: percentage(correct, total) as i64,
            total_xp: correct * 10,
            total_solved: total,
        });
    }

    let lesson_rows = sqlx::query(
        r#"
        SELECT
          l."id" AS "id",
          l."title" AS "title",
          (SELECT COUNT(*) FROM "questions" q WHERE q."lessonId" = l."id") AS "questionCount",
          (SELECT COUNT(*)
             FROM "answer_records" r
             JOIN "questions" q ON q."id" = r."questionId"
            WHERE q."lessonId" = l."id") AS "attemptCount",
          (SELECT COUNT(*)
             FROM "answer_records" r
             JOIN "questions" q ON q."id" = r."questionId"
            WHERE q."lessonId" = l."id" AND r."isCorrect" = 1) AS "correctCount"
        FROM "lessons" l
        ORDER BY l."title"
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut lessons = Vec::with_capacity(lesson_rows.len());
    for row in lesson_rows {
        let attempts: i64 = row.try_get("attemptCount")?;
        let correct: i64 = row.try_get("correctCount")?;
        lessons.push(LessonPerformance {
            id: row.try_get("id")?,
            name: row.try_get("title")?,
            pass_rate: percentage(correct, attempts) as i64,
            total_questions: row.try_get("questionCount")?,
        });
    }

    let total_students = students.len() as i64;
    Ok(CohortAnalytics {
        students,
        lessons,
        total_students,
    })
}

fn percentage(correct: i64, total: i64) -> f64 {
    if total > 0 {
        correct as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
