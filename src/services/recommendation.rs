use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::Db;
use crate::services::stats::{self, LessonStat};
use crate::services::EngineError;

/// Below this rate the weakest lesson is in the critical band.
pub const CRITICAL_THRESHOLD: f64 = 45.0;
/// At or above this rate the weakest lesson is considered mastered.
pub const MASTERY_THRESHOLD: f64 = 75.0;
/// Average seconds per question below which the learner is diagnosed as
/// rushing instead of under-practicing.
pub const RUSH_TIME_SECONDS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: String,
    pub reason: String,
    pub tip: String,
    pub priority: Priority,
    pub is_critical: bool,
    pub target_lesson: Option<String>,
}

/// Pure mapping from (lesson breakdown, average time) to a coaching action.
/// Recomputed on every request; nothing is persisted.
///
/// The weakest lesson is the minimum success rate; on ties the first entry
/// in the breakdown's enumeration order wins, which for the BTreeMap
/// produced by `stats::lesson_breakdown` is the lexicographically smallest
/// title.
pub fn recommend(
    breakdown: &BTreeMap<String, LessonStat>,
    avg_time_seconds: f64,
) -> Recommendation {
    let Some((title, stat)) = weakest_lesson(breakdown) else {
        return Recommendation {
            action: "Start Diagnostic".to_string(),
            reason: "No answer history yet. A short diagnostic establishes your starting level."
                .to_string(),
            tip: "Focus on completion rather than speed for your first quiz.".to_string(),
            priority: Priority::High,
            is_critical: false,
            target_lesson: None,
        };
    };

    let rate = stat.success_rate;

    if rate < CRITICAL_THRESHOLD {
        return Recommendation {
            action: "Critical Review".to_string(),
            reason: format!("Your success rate in {title} is {rate:.1}%, below the 45% threshold."),
            tip: "Reread the lesson material before attempting new questions.".to_string(),
            priority: Priority::High,
            is_critical: true,
            target_lesson: Some(title.clone()),
        };
    }

    if rate < MASTERY_THRESHOLD {
        let (action, reason, tip) = if avg_time_seconds < RUSH_TIME_SECONDS {
            (
                "Focus Practice",
                format!(
                    "Accuracy in {title} is {rate:.1}% and your answers average under {RUSH_TIME_SECONDS:.0}s; rushing is costing easy points."
                ),
                "Spend more time reading each question before answering.",
            )
        } else {
            (
                "Deep Practice",
                format!(
                    "Accuracy in {title} is {rate:.1}%; it needs more repetitions to consolidate."
                ),
                "Keep a steady pace; you are close to mastery.",
            )
        };
        return Recommendation {
            action: action.to_string(),
            reason,
            tip: tip.to_string(),
            priority: Priority::Normal,
            is_critical: false,
            target_lesson: Some(title.clone()),
        };
    }

    Recommendation {
        action: "Challenge: Hard Level".to_string(),
        reason: format!(
            "Even your weakest lesson, {title}, is at {rate:.1}%. Time to push your limits."
        ),
        tip: "Try high-difficulty questions to keep progressing.".to_string(),
        priority: Priority::Normal,
        is_critical: false,
        target_lesson: Some(title.clone()),
    }
}

fn weakest_lesson(breakdown: &BTreeMap<String, LessonStat>) -> Option<(&String, &LessonStat)> {
    let mut weakest: Option<(&String, &LessonStat)> = None;
    for (title, stat) in breakdown {
        match weakest {
            // Strict comparison keeps the first (smallest title) on ties.
            Some((_, best)) if stat.success_rate >= best.success_rate => {}
            _ => weakest = Some((title, stat)),
        }
    }
    weakest
}

/// Composes the aggregation output into a recommendation for one learner.
pub async fn recommendation_for_learner(
    db: &Db,
    learner_id: &str,
) -> Result<Recommendation, EngineError> {
    let breakdown = stats::lesson_breakdown(db, learner_id).await?;
    let totals = stats::total_stats(db, learner_id).await?;
    Ok(recommend(&breakdown, totals.avg_time_seconds))
}
