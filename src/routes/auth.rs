use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::email::{notify, AccountDecisionEmail, NewSignupEmail};
use crate::error::HallResult;
use crate::models::user::session::Session;
use crate::models::user::{LoginForm, RejectionReason, SignupForm, SignupOutcome, User};
use crate::routes::guards::{AdminUser, CurrentUser, JsonBody};
use crate::routes::AppState;
use crate::util::{current_time, non_blank};

pub async fn signup(
    Extension(state): Extension<AppState>,
    JsonBody(form): JsonBody<SignupForm>,
) -> HallResult<(StatusCode, Json<Value>)> {
    let outcome = User::signup(
        form,
        state.config.session_ttl,
        current_time(),
        state.store.as_ref(),
    )
    .await?;

    match outcome {
        SignupOutcome::LoggedIn { user, session } => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Signup successful. You are now logged in.",
                "token": session.token,
                "role": user.role,
                "status": user.status,
            })),
        )),
        SignupOutcome::AwaitingApproval { user } => {
            match &state.config.mail.admin_email {
                Some(admin) => {
                    let email = NewSignupEmail::new(admin, &user, &state.config.mail.frontend_url);
                    notify(state.mailer.as_ref(), email).await;
                }
                None => tracing::debug!("no admin email set, not announcing signup"),
            }

            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "message": "Signup successful. Your account is awaiting admin approval.",
                    "status": user.status,
                })),
            ))
        }
    }
}

pub async fn login(
    Extension(state): Extension<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> HallResult<Json<Value>> {
    let (user, session) = User::login(
        form,
        state.config.session_ttl,
        current_time(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(json!({
        "token": session.token,
        "role": user.role,
        "name": user.name,
        "expiresAt": session.expires_at.unix_timestamp(),
    })))
}

pub async fn logout(
    Extension(state): Extension<AppState>,
    CurrentUser(user): CurrentUser,
) -> HallResult<Json<Value>> {
    Session::end_all(user.id, state.store.as_ref()).await?;

    Ok(Json(json!({ "message": "Logged out." })))
}

pub async fn pending_users(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
) -> HallResult<Json<Vec<User>>> {
    User::pending(state.store.as_ref()).await.map(Json)
}

pub async fn approve_user(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> HallResult<Json<Value>> {
    let user = User::approve(id, state.store.as_ref()).await?;

    let email = AccountDecisionEmail::new(&user, None, &state.config.mail.frontend_url);
    notify(state.mailer.as_ref(), email).await;

    Ok(Json(json!({
        "message": "User approved successfully.",
        "user": user,
    })))
}

pub async fn reject_user(
    Extension(state): Extension<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    body: Option<JsonBody<RejectionReason>>,
) -> HallResult<Json<Value>> {
    let reason = body.and_then(|JsonBody(body)| non_blank(body.reason));
    let user = User::reject(id, state.store.as_ref()).await?;

    let email =
        AccountDecisionEmail::new(&user, reason.as_deref(), &state.config.mail.frontend_url);
    notify(state.mailer.as_ref(), email).await;

    Ok(Json(json!({
        "message": "User rejected successfully.",
        "user": user,
    })))
}
