//! Error types for SCAN core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Help can only be requested at least {minutes} minutes in advance")]
    TooSoon { minutes: i64 },

    #[error("A help request is already active")]
    RequestActive,

    #[error("No active help request found")]
    NoActiveRequest,

    #[error("This help request has already been accepted by another volunteer")]
    AlreadyAssigned,

    #[error("No volunteer assigned to this request")]
    NoVolunteerAssigned,

    #[error("Invalid completion code")]
    InvalidCode,

    #[error("Requests can only be cancelled up to 2 hours before the requested time once a volunteer is assigned")]
    CancelWindowClosed,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    /// True for errors raised by input validation, before any state is touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::UnknownLocation(_)
                | Error::InvalidSchedule(_)
                | Error::TooSoon { .. }
        )
    }

    /// True for errors caused by the help request's current state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::RequestActive
                | Error::NoActiveRequest
                | Error::AlreadyAssigned
                | Error::NoVolunteerAssigned
                | Error::InvalidCode
                | Error::CancelWindowClosed
        )
    }

    /// True for token decoding/verification failures
    pub fn is_token(&self) -> bool {
        matches!(self, Error::InvalidToken(_) | Error::TokenExpired)
    }
}
