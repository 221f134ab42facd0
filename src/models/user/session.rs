use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::db::Store;
use crate::error::{HallError, HallResult};
use crate::models::user::{User, UserStatus};

/// A login, identified by the token clients send back in the `HALL_TOKEN` header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn new(user_id: i32, ttl: Duration, now: OffsetDateTime) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Finds the approved user logged in with `token`.
    pub async fn user_for_token(
        token: &str,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<User> {
        let mut tx = store.begin().await?;
        let session = tx
            .session_with_token(token)
            .await?
            .filter(|session| !session.is_expired(now))
            .ok_or(HallError::Unauthorized)?;
        let user = tx
            .user_with_id(session.user_id)
            .await?
            .ok_or(HallError::Unauthorized)?;
        tx.commit().await?;

        match user.status {
            UserStatus::Approved => Ok(user),
            UserStatus::Pending => Err(HallError::AccountPending),
            UserStatus::Rejected => Err(HallError::AccountRejected),
        }
    }

    /// Logs the user out everywhere.
    pub async fn end_all(user_id: i32, store: &dyn Store) -> HallResult<()> {
        let mut tx = store.begin().await?;
        tx.delete_sessions_for(user_id).await?;
        tx.commit().await?;

        Ok(())
    }
}
