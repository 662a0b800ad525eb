pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::schema::{split_sql_statements, strip_line_comments, SCHEMA_SQL};

const SCHEMA_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid database url: {0}")]
    Config(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Handle to the answer-record store. Services take `&Db` explicitly;
/// there is no process-wide singleton.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self, DbInitError> {
        if let Some(path) = file_path_of(url) {
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| DbInitError::Io(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbInitError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Single-connection in-memory database for tests. The connection cap
    /// keeps every query on the same in-memory instance.
    pub async fn in_memory() -> Result<Self, DbInitError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbInitError::Config(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn run_migrations(&self) -> Result<(), DbInitError> {
        let version: Option<String> = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None);

        if version.is_some() {
            return Ok(());
        }

        for stmt in split_sql_statements(SCHEMA_SQL) {
            let sql = strip_line_comments(&stmt);
            let trimmed = sql.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', $1)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn file_path_of(url: &str) -> Option<String> {
    let rest = url.strip_prefix("sqlite:")?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(path.to_string())
}
