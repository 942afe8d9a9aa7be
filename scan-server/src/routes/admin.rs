//! Admin dashboard endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use scan_core::AccountId;
use serde::{Deserialize, Serialize};

use crate::email::EmailSender;
use crate::error::ScanError;
use crate::state::AppState;
use crate::store::{AccountStore, AccountView};
use crate::sweeper::SweepReport;

use super::auth::MessageResponse;
use super::help::RequestResponse;
use super::session::authenticate;
use super::volunteer::ListingsResponse;

#[derive(Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<AccountView>,
}

impl UsersResponse {
    fn ok(users: Vec<AccountView>) -> Json<Self> {
        Json(Self {
            success: true,
            users,
        })
    }
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: SweepReport,
}

/// GET /api/admin/volunteers/pending
pub async fn pending_volunteers<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<UsersResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    Ok(UsersResponse::ok(state.admin.pending_volunteers(&admin)?))
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub success: bool,
    pub user: AccountView,
}

/// PATCH /api/admin/volunteers/:id/approve
pub async fn approve_volunteer<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
) -> Result<Json<ApproveResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    let user = state.admin.approve_volunteer(&admin, id)?;
    Ok(Json(ApproveResponse {
        success: true,
        user,
    }))
}

/// DELETE /api/admin/volunteers/:id
pub async fn reject_volunteer<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    state.admin.reject_volunteer(&admin, id)?;
    Ok(MessageResponse::ok("Volunteer rejected and removed"))
}

#[derive(Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub role: String,
}

/// GET /api/admin/users?role=Citizen|Volunteer
pub async fn list_users<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    Ok(UsersResponse::ok(state.admin.list_users(&admin, &query.role)?))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    state.admin.delete_user(&admin, id)?;
    Ok(MessageResponse::ok("User deleted"))
}

#[derive(Deserialize)]
pub struct BannedQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// GET /api/admin/users/banned?category=&search=
pub async fn list_banned<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Query(query): Query<BannedQuery>,
) -> Result<Json<UsersResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    let users = state.admin.list_banned(
        &admin,
        query.category.as_deref(),
        query.search.as_deref(),
    )?;
    Ok(UsersResponse::ok(users))
}

/// PATCH /api/admin/users/:id/ban
pub async fn ban_user<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    state.admin.ban_user(&admin, id)?;
    Ok(MessageResponse::ok("User banned"))
}

/// PATCH /api/admin/users/:id/unban
pub async fn unban_user<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(id): Path<AccountId>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    state.admin.unban_user(&admin, id)?;
    Ok(MessageResponse::ok("User unbanned"))
}

/// GET /api/admin/helps
pub async fn list_helps<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<ListingsResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    Ok(Json(ListingsResponse {
        success: true,
        requests: state.admin.list_helps(&admin)?,
    }))
}

/// PATCH /api/admin/helps/:id/complete
pub async fn complete_help<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(citizen_id): Path<AccountId>,
) -> Result<Json<RequestResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    let request = state.admin.complete_help(&admin, citizen_id)?;
    Ok(Json(RequestResponse {
        success: true,
        request,
    }))
}

/// PATCH /api/admin/helps/:id/cancel
pub async fn cancel_help<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
    Path(citizen_id): Path<AccountId>,
) -> Result<Json<MessageResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    state.admin.cancel_help(&admin, citizen_id)?;
    Ok(MessageResponse::ok("Help request cancelled"))
}

/// POST /api/admin/sweep
pub async fn run_sweep<S, E>(
    State(state): State<Arc<AppState<S, E>>>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ScanError>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let admin = authenticate(&state, &headers)?;
    let report = state.admin.run_sweep(&admin)?;
    Ok(Json(SweepResponse {
        success: true,
        report,
    }))
}
