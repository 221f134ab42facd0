use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::email::{notify, NewBookingEmail};
use crate::error::HallResult;
use crate::models::booking::{Booking, BookingUpdate, NewBooking, PublicBooking};
use crate::routes::guards::{JsonBody, Requester};
use crate::routes::AppState;
use crate::util::current_time;

pub async fn create(
    Extension(state): Extension<AppState>,
    Requester(user): Requester,
    JsonBody(new_booking): JsonBody<NewBooking>,
) -> HallResult<(StatusCode, Json<Value>)> {
    let booking = Booking::submit(
        &user,
        new_booking,
        &state.config.rules,
        current_time(),
        state.store.as_ref(),
    )
    .await?;

    match &state.config.mail.admin_email {
        Some(admin) => {
            let email =
                NewBookingEmail::new(admin, &user, &booking, &state.config.mail.frontend_url);
            notify(state.mailer.as_ref(), email).await;
        }
        None => tracing::debug!("no admin email set, not announcing booking {}", booking.id),
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking created successfully! Admin has been notified and will review your request.",
            "booking": booking,
        })),
    ))
}

pub async fn mine(
    Extension(state): Extension<AppState>,
    Requester(user): Requester,
) -> HallResult<Json<Vec<Booking>>> {
    Booking::for_user(user.id, state.store.as_ref()).await.map(Json)
}

pub async fn public_calendar(
    Extension(state): Extension<AppState>,
) -> HallResult<Json<Vec<PublicBooking>>> {
    Booking::public_calendar(&state.config.rules, current_time(), state.store.as_ref())
        .await
        .map(Json)
}

pub async fn update(
    Extension(state): Extension<AppState>,
    Requester(user): Requester,
    Path(id): Path<i32>,
    JsonBody(update): JsonBody<BookingUpdate>,
) -> HallResult<Json<Value>> {
    let booking = Booking::update(
        id,
        &user,
        update,
        &state.config.rules,
        current_time(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Booking updated successfully.",
        "booking": booking,
    })))
}

pub async fn withdraw(
    Extension(state): Extension<AppState>,
    Requester(user): Requester,
    Path(id): Path<i32>,
) -> HallResult<Json<Value>> {
    let booking = Booking::withdraw(
        id,
        &user,
        &state.config.rules,
        current_time(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Booking cancelled successfully.",
        "booking": booking,
    })))
}
