use chrono::Utc;
use uuid::Uuid;

use crate::db::Db;
use crate::services::lesson::CreateLessonInput;
use crate::services::question::CreateQuestionInput;
use crate::services::{lesson, question};

pub fn seeding_enabled() -> bool {
    std::env::var("SEED_DEMO_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

struct SeedUser {
    username: &'static str,
    email: &'static str,
    password: &'static str,
    role: &'static str,
}

const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        username: "demo_student",
        email: "student@example.com",
        password: "StudentPass123!",
        role: "student",
    },
    SeedUser {
        username: "demo_teacher",
        email: "teacher@example.com",
        password: "TeacherPass123!",
        role: "teacher",
    },
];

/// Seeds two demo accounts and one starter lesson with questions. Each step
/// is independent and skipped when the row already exists, so restarting
/// with seeding enabled is harmless.
pub async fn seed_demo_data(db: &Db) {
    for user in SEED_USERS {
        seed_user(db, user).await;
    }
    seed_starter_lesson(db).await;
}

async fn seed_user(db: &Db, user: &SeedUser) {
    let existing: Option<String> =
        match sqlx::query_scalar(r#"SELECT "id" FROM "users" WHERE "email" = $1"#)
            .bind(user.email)
            .fetch_optional(db.pool())
            .await
        {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, email = user.email, "seed user lookup failed");
                return;
            }
        };

    if existing.is_some() {
        tracing::debug!(email = user.email, "seed user already exists");
        return;
    }

    let password_hash = match bcrypt::hash(user.password, 10) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::warn!(error = %err, email = user.email, "failed to hash seed password");
            return;
        }
    };

    let user_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().naive_utc();

    if let Err(err) = sqlx::query(
        r#"
        INSERT INTO "users" ("id","username","email","passwordHash","role","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6)
        "#,
    )
    .bind(&user_id)
    .bind(user.username)
    .bind(user.email)
    .bind(&password_hash)
    .bind(user.role)
    .bind(created_at)
    .execute(db.pool())
    .await
    {
        tracing::warn!(error = %err, email = user.email, "failed to seed user");
    } else {
        tracing::info!(email = user.email, role = user.role, "seeded user");
    }
}

async fn seed_starter_lesson(db: &Db) {
    let created = match lesson::create_lesson(
        db,
        CreateLessonInput {
            title: "Foundations of Algebra".to_string(),
            description: Some("Linear equations and basic manipulation.".to_string()),
            content_text: Some(
                "An equation stays balanced when the same operation is applied to both sides."
                    .to_string(),
            ),
            difficulty: 2,
        },
    )
    .await
    {
        Ok(lesson) => lesson,
        Err(crate::services::EngineError::Conflict(_)) => {
            tracing::debug!("starter lesson already exists");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to seed starter lesson");
            return;
        }
    };

    let questions = vec![
        ("Solve x + 3 = 7.", "x = 10", "x = 4", "x = 7", "x = 3", "B", 1),
        ("Solve 2x = 12.", "x = 6", "x = 24", "x = 10", "x = 2", "A", 1),
        (
            "Which value of x satisfies 3x - 1 = 8?",
            "x = 2",
            "x = 4",
            "x = 3",
            "x = 9",
            "C",
            2,
        ),
        (
            "Simplify 2(x + 4) - 3.",
            "2x + 1",
            "2x + 8",
            "2x + 5",
            "x + 5",
            "C",
            3,
        ),
    ];

    for (content, a, b, c, d, correct, difficulty) in questions {
        if let Err(err) = question::create_question(
            db,
            CreateQuestionInput {
                lesson_id: created.id.clone(),
                content: content.to_string(),
                option_a: a.to_string(),
                option_b: b.to_string(),
                option_c: c.to_string(),
                option_d: d.to_string(),
                correct_answer: correct.to_string(),
                difficulty_level: difficulty,
            },
        )
        .await
        {
            tracing::warn!(error = %err, "failed to seed starter question");
        }
    }

    tracing::info!(lesson = %created.title, "seeded starter lesson");
}
