//! Error handling for the API.
//!
//! Prefer adding a variant to [`HallError`] over forcing a failure into a
//! generic `BadRequest` or `ServerError`, and document its status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::models::booking::conflict::ConflictingBooking;
use crate::models::booking::BookingStatus;

/// The error enum for all error handling across the API.
///
/// Every variant renders as a JSON body with at least a `message` and a
/// `statusCode` field; see [`HallError::as_response`].
#[derive(Debug, thiserror::Error)]
pub enum HallError {
    /// \[404\] The requested resource doesn't exist (or isn't visible to the caller).
    #[error("{0}")]
    NotFound(String),
    /// \[401\] The endpoint requires a logged-in user.
    #[error("login required")]
    Unauthorized,
    /// \[400\] The token header wasn't valid UTF-8.
    #[error("invalid token header")]
    InvalidTokenHeader,
    /// \[403\] The user's role doesn't allow this action.
    ///
    /// Includes a `requiredRole` field listing the roles that are allowed.
    #[error("access forbidden")]
    Forbidden(Option<String>),
    /// \[400\] Wrong email or password.
    #[error("Invalid credentials.")]
    InvalidCredentials,
    /// \[403\] The account hasn't been approved by an admin yet.
    #[error("Account pending admin approval. Please wait for activation.")]
    AccountPending,
    /// \[403\] The account was rejected by an admin.
    #[error("Account registration rejected. Please contact support.")]
    AccountRejected,
    /// \[400\] The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),
    /// \[400\] The resource to be created already exists.
    #[error("{0}")]
    AlreadyExists(String),
    /// \[400\] The booking isn't in a status that allows the requested change.
    #[error("Booking status is '{current}'. {allowed}")]
    InvalidStatus {
        current: BookingStatus,
        allowed: &'static str,
    },
    /// \[400\] An approved booking can only be cancelled well before it starts.
    #[error("Cannot cancel approved booking less than {notice_hours} hours before the event start time.")]
    CancellationTooLate { notice_hours: i64 },
    /// \[409\] The requested slot collides with other bookings.
    ///
    /// The `conflictingBookings` field lists the colliding bookings.
    #[error("{message}")]
    Conflict {
        message: String,
        conflicting: Vec<ConflictingBooking>,
    },
    /// \[500\] An error occurred while interacting with the database.
    #[error("database error")]
    DbError(#[from] sqlx::Error),
    /// \[500\] Any other failure while handling the request.
    #[error("server error: {0}")]
    ServerError(String),
}

/// The return type for all endpoints.
pub type HallResult<T> = Result<T, HallError>;

/// The Postgres SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

impl HallError {
    /// Reports a write that lost a race on a unique column as
    /// [`HallError::AlreadyExists`] with the given message.
    pub fn on_duplicate(error: sqlx::Error, message: impl FnOnce() -> String) -> Self {
        let duplicate = error
            .as_database_error()
            .and_then(|db_error| db_error.code())
            .map_or(false, |code| code == UNIQUE_VIOLATION);

        if duplicate {
            HallError::AlreadyExists(message())
        } else {
            HallError::DbError(error)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HallError::NotFound(_) => StatusCode::NOT_FOUND,
            HallError::Unauthorized => StatusCode::UNAUTHORIZED,
            HallError::Forbidden(_) | HallError::AccountPending | HallError::AccountRejected => {
                StatusCode::FORBIDDEN
            }
            HallError::InvalidTokenHeader
            | HallError::InvalidCredentials
            | HallError::BadRequest(_)
            | HallError::AlreadyExists(_)
            | HallError::InvalidStatus { .. }
            | HallError::CancellationTooLate { .. } => StatusCode::BAD_REQUEST,
            HallError::Conflict { .. } => StatusCode::CONFLICT,
            HallError::DbError(_) | HallError::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_response(&self) -> (StatusCode, Value) {
        let mut json_val = match self {
            HallError::Forbidden(Some(roles)) => json!({ "requiredRole": roles }),
            HallError::Conflict { conflicting, .. } => {
                json!({ "conflictingBookings": conflicting })
            }
            _ => json!({}),
        };

        let status = self.status();
        json_val["statusCode"] = json!(status.as_u16());
        json_val["message"] = if status.is_server_error() {
            // internals are logged, not leaked
            json!("Server error. Please try again.")
        } else {
            json!(self.to_string())
        };

        (status, json_val)
    }
}

impl IntoResponse for HallError {
    fn into_response(self) -> Response {
        match &self {
            HallError::DbError(error) => tracing::error!("database error: {error}"),
            HallError::ServerError(error) => tracing::error!("server error: {error}"),
            _ => {}
        }

        let (status, body) = self.as_response();
        (status, Json(body)).into_response()
    }
}
