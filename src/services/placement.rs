use serde::Serialize;

use crate::db::Db;
use crate::services::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementBand {
    pub max_score: i64,
    pub level: i64,
}

/// Score-to-level banding for the diagnostic test. Bands are checked in
/// ascending `max_score` order; scores above every band map to
/// `default_level`. Configurable via the `PLACEMENT_BANDS` env variable so
/// the thresholds are not baked into the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementTable {
    bands: Vec<PlacementBand>,
    default_level: i64,
}

impl Default for PlacementTable {
    // The five-level scheme: 0-2 -> 1, 3-5 -> 2, 6-7 -> 3, 8-9 -> 4, 10+ -> 5.
    fn default() -> Self {
        Self {
            bands: vec![
                PlacementBand { max_score: 2, level: 1 },
                PlacementBand { max_score: 5, level: 2 },
                PlacementBand { max_score: 7, level: 3 },
                PlacementBand { max_score: 9, level: 4 },
            ],
            default_level: 5,
        }
    }
}

impl PlacementTable {
    /// Parses `"2:1,5:2,7:3,9:4,:5"` — comma-separated `max_score:level`
    /// pairs plus one pair with an empty score for the default level.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut bands = Vec::new();
        let mut default_level = None;

        for pair in raw.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (score, level) = pair.split_once(':')?;
            let level: i64 = level.trim().parse().ok()?;
            if level < 1 {
                return None;
            }
            if score.trim().is_empty() {
                default_level = Some(level);
            } else {
                let max_score: i64 = score.trim().parse().ok()?;
                bands.push(PlacementBand { max_score, level });
            }
        }

        let default_level = default_level?;
        bands.sort_by_key(|band| band.max_score);
        Some(Self {
            bands,
            default_level,
        })
    }

    pub fn level_for_score(&self, score: i64) -> i64 {
        self.bands
            .iter()
            .find(|band| score <= band.max_score)
            .map(|band| band.level)
            .unwrap_or(self.default_level)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResult {
    pub new_level: i64,
    pub is_placement_completed: bool,
}

/// One-shot level assignment from the diagnostic score. Idempotent: calling
/// again simply overwrites the level and leaves the completed flag set.
pub async fn complete_placement(
    db: &Db,
    table: &PlacementTable,
    learner_id: &str,
    score: i64,
) -> Result<PlacementResult, EngineError> {
    if score < 0 {
        return Err(EngineError::Validation(
            "diagnostic score must be non-negative".to_string(),
        ));
    }

    let new_level = table.level_for_score(score);

    let result = sqlx::query(
        r#"
        UPDATE "users"
        SET "currentLevel" = $2, "isPlacementCompleted" = 1
        WHERE "id" = $1
        "#,
    )
    .bind(learner_id)
    .bind(new_level)
    .execute(db.pool())
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound(format!(
            "learner {learner_id} does not exist"
        )));
    }

    tracing::info!(learner_id, score, new_level, "placement completed");

    Ok(PlacementResult {
        new_level,
        is_placement_completed: true,
    })
}
