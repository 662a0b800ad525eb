pub mod grading;
pub mod lesson;
pub mod placement;
pub mod progression;
pub mod question;
pub mod recommendation;
pub mod stats;

use thiserror::Error;

/// Error taxonomy shared by the engine services. `Store` wraps transient
/// record-store failures; read-only operations are safe to retry wholesale.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}
