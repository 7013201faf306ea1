use actix_web::ResponseError;

use crate::actix_web::http::StatusCode;
use crate::jsonwebtoken::errors::Error as JsonWebTokenError;
use crate::sqlx::Error as SqlxError;
use crate::thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("poll not found: {0}")]
    PollNotFound(String),

    #[error("option index {index} out of range for poll {poll_id}")]
    InvalidOption { poll_id: String, index: i32 },

    #[error("vote can no longer be changed")]
    VoteLocked,

    #[error("a vote for this poll already exists")]
    DuplicateVote,

    #[error("conflicting vote write")]
    Conflict,

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] SqlxError),

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("jwt error")]
    JWTError(#[from] JsonWebTokenError),

    #[error("business error: {0}")]
    BusinessError(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::PollNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidOption { .. } => StatusCode::BAD_REQUEST,
            Error::VoteLocked => StatusCode::LOCKED,
            Error::DuplicateVote | Error::Conflict => StatusCode::CONFLICT,
            Error::StoreUnavailable(_) | Error::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::JWTError(_) => StatusCode::UNAUTHORIZED,
            Error::BusinessError(_) => StatusCode::BAD_REQUEST,
        }
    }
}
