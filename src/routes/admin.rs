use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::email::{notify, BookingDecisionEmail};
use crate::error::HallResult;
use crate::models::booking::{AdminDecision, Booking, BookingDetails, BookingStats};
use crate::models::user::preapproved::{NewPreapprovedUser, PreapprovedUser};
use crate::routes::guards::{AdminUser, JsonBody};
use crate::routes::AppState;
use crate::util::current_time;

pub async fn pending_bookings(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
) -> HallResult<Json<Vec<BookingDetails>>> {
    Booking::pending(state.store.as_ref()).await.map(Json)
}

pub async fn all_bookings(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
) -> HallResult<Json<Vec<BookingDetails>>> {
    Booking::all(state.store.as_ref()).await.map(Json)
}

pub async fn booking_stats(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
) -> HallResult<Json<BookingStats>> {
    Booking::stats(state.store.as_ref()).await.map(Json)
}

pub async fn booking_details(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> HallResult<Json<BookingDetails>> {
    Booking::with_id(id, state.store.as_ref()).await.map(Json)
}

pub async fn approve_booking(
    Extension(state): Extension<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    body: Option<JsonBody<AdminDecision>>,
) -> HallResult<Json<Value>> {
    let decision = body.map(|JsonBody(decision)| decision).unwrap_or_default();
    let details = Booking::approve(
        id,
        decision,
        &state.config.rules,
        current_time(),
        state.store.as_ref(),
    )
    .await?;
    tracing::info!("{} approved booking {id}", admin.email);

    let email = BookingDecisionEmail::new(&details, &state.config.mail.frontend_url);
    notify(state.mailer.as_ref(), email).await;

    Ok(Json(json!({
        "message": "Booking approved successfully.",
        "booking": details.booking,
    })))
}

pub async fn reject_booking(
    Extension(state): Extension<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    body: Option<JsonBody<AdminDecision>>,
) -> HallResult<Json<Value>> {
    let decision = body.map(|JsonBody(decision)| decision).unwrap_or_default();
    let details = Booking::reject(
        id,
        decision,
        &state.config.rules,
        current_time(),
        state.store.as_ref(),
    )
    .await?;
    tracing::info!("{} rejected booking {id}", admin.email);

    let email = BookingDecisionEmail::new(&details, &state.config.mail.frontend_url);
    notify(state.mailer.as_ref(), email).await;

    Ok(Json(json!({
        "message": "Booking rejected successfully.",
        "booking": details.booking,
    })))
}

pub async fn preapproved_users(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
) -> HallResult<Json<Vec<PreapprovedUser>>> {
    PreapprovedUser::all(state.store.as_ref()).await.map(Json)
}

pub async fn add_preapproved_user(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
    JsonBody(new_entry): JsonBody<NewPreapprovedUser>,
) -> HallResult<(StatusCode, Json<PreapprovedUser>)> {
    let entry = PreapprovedUser::add(new_entry, current_time(), state.store.as_ref()).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn remove_preapproved_user(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> HallResult<StatusCode> {
    PreapprovedUser::remove(id, state.store.as_ref()).await?;

    Ok(StatusCode::NO_CONTENT)
}
