//! Extractors that authenticate requests and decode their bodies.

use axum::body::HttpBody;
use axum::extract::{FromRequest, RequestParts};
use axum::http::HeaderMap;
use axum::{BoxError, Extension, Json};
use serde::de::DeserializeOwned;

use crate::error::{HallError, HallResult};
use crate::models::user::session::Session;
use crate::models::user::{Role, User};
use crate::routes::AppState;
use crate::util::current_time;

pub const HALL_TOKEN: &str = "HALL_TOKEN";

pub fn get_token(headers: &HeaderMap) -> HallResult<Option<&str>> {
    headers
        .get(HALL_TOKEN)
        .map(|value| value.to_str().map_err(|_| HallError::InvalidTokenHeader))
        .transpose()
}

async fn app_state<B: Send>(req: &mut RequestParts<B>) -> HallResult<AppState> {
    let Extension(state) = Extension::<AppState>::from_request(req)
        .await
        .map_err(|err| HallError::ServerError(format!("App state missing: {err}")))?;

    Ok(state)
}

/// Any logged-in user whose account is approved.
pub struct CurrentUser(pub User);

#[async_trait::async_trait]
impl<B: Send> FromRequest<B> for CurrentUser {
    type Rejection = HallError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let state = app_state(req).await?;
        let token = get_token(req.headers())?
            .ok_or(HallError::Unauthorized)?
            .to_owned();
        let user = Session::user_for_token(&token, current_time(), state.store.as_ref()).await?;

        Ok(Self(user))
    }
}

/// A logged-in admin.
pub struct AdminUser(pub User);

#[async_trait::async_trait]
impl<B: Send> FromRequest<B> for AdminUser {
    type Rejection = HallError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request(req).await?;
        user.ensure_role(Role::ADMINS)?;

        Ok(Self(user))
    }
}

/// A logged-in club leader or faculty member, who can book the hall.
pub struct Requester(pub User);

#[async_trait::async_trait]
impl<B: Send> FromRequest<B> for Requester {
    type Rejection = HallError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request(req).await?;
        user.ensure_role(Role::REQUESTERS)?;

        Ok(Self(user))
    }
}

/// A JSON request body, rejected with the API's own error format.
pub struct JsonBody<T>(pub T);

#[async_trait::async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = HallError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req)
            .await
            .map_err(|rejection| HallError::BadRequest(rejection.to_string()))?;

        Ok(Self(value))
    }
}
