use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::Store;
use crate::error::{HallError, HallResult};
use crate::models::user::Role;
use crate::util::{is_valid_email, non_blank};

/// Someone an admin has cleared to sign up without waiting for approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PreapprovedUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// The role the user gets when they sign up
    pub role: Role,
    /// Whether the entry has been used to sign up
    pub is_registered: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewPreapprovedUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl PreapprovedUser {
    pub async fn all(store: &dyn Store) -> HallResult<Vec<PreapprovedUser>> {
        let mut tx = store.begin().await?;
        let entries = tx.all_preapproved().await?;
        tx.commit().await?;

        Ok(entries)
    }

    pub async fn add(
        new_entry: NewPreapprovedUser,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<PreapprovedUser> {
        let (name, email) = match (non_blank(new_entry.name), non_blank(new_entry.email)) {
            (Some(name), Some(email)) => (name, email.to_lowercase()),
            _ => {
                return Err(HallError::BadRequest(
                    "Please enter a name and email.".to_owned(),
                ))
            }
        };
        if !is_valid_email(&email) {
            return Err(HallError::BadRequest(
                "Please enter a valid email address.".to_owned(),
            ));
        }
        let role = new_entry.role.unwrap_or(Role::DEFAULT);

        let mut tx = store.begin().await?;
        if tx.preapproved_with_email(&email).await?.is_some() {
            return Err(HallError::AlreadyExists(format!(
                "{email} is already pre-approved."
            )));
        }
        let entry = tx.insert_preapproved(&name, &email, role, now).await?;
        tx.commit().await?;

        tracing::info!("pre-approved {} as {}", entry.email, entry.role);
        Ok(entry)
    }

    pub async fn remove(id: i32, store: &dyn Store) -> HallResult<()> {
        let mut tx = store.begin().await?;
        if !tx.delete_preapproved(id).await? {
            return Err(HallError::NotFound(format!(
                "No pre-approved user with id {id}"
            )));
        }
        tx.commit().await?;

        Ok(())
    }
}
