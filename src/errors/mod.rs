use thiserror::Error;

pub type MatchResult<T> = Result<T, MatchError>;

/// Failure modes of the matching and assignment lifecycle. Storage and
/// pool-level problems are carried as `Storage`; everything else maps to a
/// caller-visible condition.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("cannot {action} {id} in status '{status}'")]
    InvalidState {
        action: &'static str,
        id: i64,
        status: &'static str,
    },

    #[error("response deadline has passed for assignment {0}")]
    DeadlineExceeded(i64),

    #[error("game has not finished yet for assignment {0}")]
    TooEarly(i64),

    #[error("no eligible referee found for game {0}")]
    NoEligibleCandidate(i64),

    #[error("{0}")]
    Validation(String),

    #[error("external service failed: {0}")]
    ExternalService(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for MatchError {
    fn from(err: rusqlite::Error) -> Self {
        MatchError::Storage(err.into())
    }
}

impl From<r2d2::Error> for MatchError {
    fn from(err: r2d2::Error) -> Self {
        MatchError::Storage(err.into())
    }
}
