//! HTTP routes

mod admin;
mod auth;
mod help;
mod session;
mod volunteer;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::state::AppState;
use crate::store::AccountStore;

type AppRouter<S, E> = Router<Arc<AppState<S, E>>>;

/// Create the router with all routes
pub fn create_router<S, E>(state: Arc<AppState<S, E>>) -> Router
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes())
        .nest("/api/help", help_routes())
        .nest("/api/volunteer", volunteer_routes())
        .nest("/api/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn auth_routes<S, E>() -> AppRouter<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/signup", post(auth::signup::<S, E>))
        .route("/verify-email", post(auth::verify_email::<S, E>))
        .route("/login", post(auth::login::<S, E>))
        .route("/logout", post(auth::logout::<S, E>))
        .route("/refresh-token", post(auth::refresh_token::<S, E>))
        .route("/forgot-password", post(auth::forgot_password::<S, E>))
        .route("/reset-password/:token", post(auth::reset_password::<S, E>))
        .route("/check-auth", get(auth::me::<S, E>))
        .route("/me", get(auth::me::<S, E>))
        .route("/update-profile", put(auth::update_profile::<S, E>))
}

fn help_routes<S, E>() -> AppRouter<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/", get(help::current::<S, E>))
        .route("/request", post(help::request_help::<S, E>))
        .route("/cancel", post(help::cancel::<S, E>))
}

fn volunteer_routes<S, E>() -> AppRouter<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/requests", get(volunteer::list_requests::<S, E>))
        .route("/accept", post(volunteer::accept::<S, E>))
        .route("/complete", post(volunteer::complete::<S, E>))
}

fn admin_routes<S, E>() -> AppRouter<S, E>
where
    S: AccountStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/volunteers/pending", get(admin::pending_volunteers::<S, E>))
        .route("/volunteers/:id/approve", patch(admin::approve_volunteer::<S, E>))
        .route("/volunteers/:id", delete(admin::reject_volunteer::<S, E>))
        .route("/users", get(admin::list_users::<S, E>))
        .route("/users/banned", get(admin::list_banned::<S, E>))
        .route("/users/:id", delete(admin::delete_user::<S, E>))
        .route("/users/:id/ban", patch(admin::ban_user::<S, E>))
        .route("/users/:id/unban", patch(admin::unban_user::<S, E>))
        .route("/helps", get(admin::list_helps::<S, E>))
        .route("/helps/:id/complete", patch(admin::complete_help::<S, E>))
        .route("/helps/:id/cancel", patch(admin::cancel_help::<S, E>))
        .route("/sweep", post(admin::run_sweep::<S, E>))
}

/// An empty origin list allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(%origin, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[derive(Serialize)]
struct HealthResponse {
    success: bool,
    status: &'static str,
}

/// GET /api/health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok",
    })
}
