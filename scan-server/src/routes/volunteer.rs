//! Volunteer endpoints: browse, accept and complete help requests

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::email::EmailSender;
use crate::error::ScanError;
use crate::help::HelpListing;
use crate::state::AppState;
use crate::store::AccountStore;

use super::help::RequestResponse;
use super::session::authenticate;

#[derive(Serialize)]
pub struct ListingsResponse {
    pub success: bool,
    pub requests: Vec<HelpListing>,
}

/// GET /api/volunteer/requests
pub async fn list_requests<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<ListingsResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let volunteer = authenticate(&state, &headers)?;
    let requests = state.help.list_open_or_mine(&volunteer)?;
    Ok(Json(ListingsResponse {
        success: true,
        requests,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    pub citizen_email: String,
}

/// POST /api/volunteer/accept
pub async fn accept<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<RequestResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let volunteer = authenticate(&state, &headers)?;
    let request = state.help.accept(&volunteer, &req.citizen_email)?;
    Ok(Json(RequestResponse {
        success: true,
        request,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub citizen_email: String,
    pub code: String,
}

/// POST /api/volunteer/complete
pub async fn complete<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<RequestResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let volunteer = authenticate(&state, &headers)?;
    let request = state
        .help
        .complete(&volunteer, &req.citizen_email, &req.code)?;
    Ok(Json(RequestResponse {
        success: true,
        request,
    }))
}
