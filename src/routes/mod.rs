//! The JSON API.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::email::Mailer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod guards;

/// Everything a handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/admin/users/pending", get(auth::pending_users))
        .route("/api/auth/admin/users/:id/approve", put(auth::approve_user))
        .route("/api/auth/admin/users/:id/reject", put(auth::reject_user))
        .route("/api/bookings", post(bookings::create).get(bookings::mine))
        .route("/api/bookings/public", get(bookings::public_calendar))
        .route("/api/bookings/:id", put(bookings::update).delete(bookings::withdraw))
        .route("/api/admin/bookings/pending", get(admin::pending_bookings))
        .route("/api/admin/bookings/all", get(admin::all_bookings))
        .route("/api/admin/bookings/stats", get(admin::booking_stats))
        .route("/api/admin/bookings/:id", get(admin::booking_details))
        .route("/api/admin/bookings/:id/approve", put(admin::approve_booking))
        .route("/api/admin/bookings/:id/reject", put(admin::reject_booking))
        .route(
            "/api/admin/preapproved",
            get(admin::preapproved_users).post(admin::add_preapproved_user),
        )
        .route(
            "/api/admin/preapproved/:id",
            axum::routing::delete(admin::remove_preapproved_user),
        )
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
