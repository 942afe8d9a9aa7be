//! Bearer-token helpers shared by the authenticated routes

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::email::EmailSender;
use crate::error::ScanError;
use crate::state::AppState;
use crate::store::{Account, AccountStore};

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller's account from the request headers
pub fn authenticate<S, E>(state: &AppState<S, E>, headers: &HeaderMap) -> Result<Account, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let token = bearer_token(headers).ok_or(ScanError::Unauthenticated("No token provided"))?;
    state.sessions.authenticate(token)
}
