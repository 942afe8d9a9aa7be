//! Citizen help request endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use scan_core::{HelpDetails, HelpRequest};
use serde::Serialize;

use crate::email::EmailSender;
use crate::error::ScanError;
use crate::state::AppState;
use crate::store::AccountStore;

use super::auth::MessageResponse;
use super::session::authenticate;

#[derive(Serialize)]
pub struct RequestResponse {
    pub success: bool,
    pub request: HelpRequest,
}

/// GET /api/help
///
/// The caller's own request, completion code included.
pub async fn current<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<RequestResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let account = authenticate(&state, &headers)?;
    Ok(Json(RequestResponse {
        success: true,
        request: account.help_request,
    }))
}

/// POST /api/help/request
pub async fn request_help<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Json(details): Json<HelpDetails>,
) -> Result<(StatusCode, Json<RequestResponse>), ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let citizen = authenticate(&state, &headers)?;
    let request = state.help.request(&citizen, details)?;
    Ok((
        StatusCode::CREATED,
        Json(RequestResponse {
            success: true,
            request,
        }),
    ))
}

/// POST /api/help/cancel
pub async fn cancel<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let citizen = authenticate(&state, &headers)?;
    state.help.cancel(&citizen)?;
    Ok(MessageResponse::ok("Help request cancelled"))
}
