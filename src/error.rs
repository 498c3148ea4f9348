use thiserror::Error;
use uuid::Uuid;

/// Persistence-level failures surfaced by any `EngineStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("record not found")]
    NotFound,
    #[error("version conflict")]
    VersionConflict,
}

/// Failures of primary engine operations. Side-effect paths (detection
/// clustering, fan-out, scheduler firings) log and count instead of
/// returning these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pet {0} not found")]
    PetNotFound(Uuid),
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("pet {0} was modified concurrently, retry the operation")]
    VersionConflict(Uuid),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => {
                EngineError::InvalidTransition("record no longer exists".to_string())
            }
            other => EngineError::Store(other),
        }
    }
}

/// Upstream-collaborator failures (classifier / enrichment). Always recovered
/// locally: the classifier maps to a generic analysis-failed response, the
/// enrichment client substitutes its rule-based fallback.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("image file not found: {0}")]
    MissingFile(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unusable response: {0}")]
    BadResponse(String),
}
