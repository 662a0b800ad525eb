use std::collections::HashMap;
use std::sync::Arc;

use sqlx::Row;

use crate::db::Db;
use crate::services::EngineError;

const NET_PER_LEVEL: i64 = 5;

/// Level derived from the cumulative net score (correct minus incorrect).
/// Floor division, so negative nets round down before the clamp at 1.
/// Not monotonic: the level falls again when the net score drops.
pub fn level_for_net(net: i64) -> i64 {
    (1 + net.div_euclid(NET_PER_LEVEL)).max(1)
}

/// One async mutex per learner, created on first use. The record insert and
/// the read-history, compute, write-level sequence run under this lock so
/// concurrent submissions for one learner cannot interleave; different
/// learners proceed in parallel.
#[derive(Default)]
pub struct LearnerLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LearnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, learner_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.locks.lock();
        Arc::clone(map.entry(learner_id.to_string()).or_default())
    }
}

/// Recomputes the learner's level from their entire answer history and
/// writes it back only when it differs from the stored value. Callers that
/// just inserted a record must hold the learner's lock across both steps.
pub async fn recompute_level(db: &Db, learner_id: &str) -> Result<i64, EngineError> {
    let pool = db.pool();

    let row = sqlx::query(
        r#"
        SELECT
          COALESCE(SUM(CASE WHEN "isCorrect" = 1 THEN 1 ELSE 0 END), 0) AS "correctCount",
          COUNT(*) AS "totalCount"
        FROM "answer_records"
        WHERE "userId" = $1
        "#,
    )
    .bind(learner_id)
    .fetch_one(pool)
    .await?;

    let correct: i64 = row.try_get("correctCount")?;
    let total: i64 = row.try_get("totalCount")?;
    let net = correct - (total - correct);
    let new_level = level_for_net(net);

    let current: Option<i64> =
        sqlx::query_scalar(r#"SELECT "currentLevel" FROM "users" WHERE "id" = $1"#)
            .bind(learner_id)
            .fetch_optional(pool)
            .await?;

    let Some(current) = current else {
        return Err(EngineError::NotFound(format!(
            "learner {learner_id} does not exist"
        )));
    };

    if current != new_level {
        sqlx::query(r#"UPDATE "users" SET "currentLevel" = $2 WHERE "id" = $1"#)
            .bind(learner_id)
            .bind(new_level)
            .execute(pool)
            .await?;
        tracing::debug!(learner_id, from = current, to = new_level, "level recomputed");
    }

    Ok(new_level)
}
