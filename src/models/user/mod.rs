use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use self::session::Session;
use crate::config::AdminAccount;
use crate::db::Store;
use crate::error::{HallError, HallResult};
use crate::util::{hash_password, is_valid_email, non_blank, verify_password};

pub mod preapproved;
pub mod session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ClubLeader,
    Faculty,
}

impl Role {
    /// The roles allowed to request and manage their own bookings.
    pub const REQUESTERS: &'static [Role] = &[Role::ClubLeader, Role::Faculty];
    pub const ADMINS: &'static [Role] = &[Role::Admin];

    /// Given to accounts that sign up without being pre-approved.
    pub const DEFAULT: Role = Role::Faculty;

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ClubLeader => "club_leader",
            Role::Faculty => "faculty",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    /// The user's email, which must be unique
    pub email: String,
    #[serde(skip)]
    pub pass_hash: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A user row about to be inserted.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub pass_hash: String,
    pub role: Role,
    pub status: UserStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Why an admin turned down an account.
#[derive(Debug, Default, Deserialize)]
pub struct RejectionReason {
    #[serde(default)]
    pub reason: Option<String>,
}

/// What happened to a signup.
#[derive(Debug)]
pub enum SignupOutcome {
    /// The email was pre-approved, so the user is already logged in.
    LoggedIn { user: User, session: Session },
    /// An admin has to approve the account first.
    AwaitingApproval { user: User },
}

impl User {
    /// Fails with [`HallError::Forbidden`] unless the user has one of `roles`.
    pub fn ensure_role(&self, roles: &[Role]) -> HallResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            let required = roles
                .iter()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(HallError::Forbidden(Some(required)))
        }
    }

    /// Accounts waiting on an admin, oldest first.
    pub async fn pending(store: &dyn Store) -> HallResult<Vec<User>> {
        let mut tx = store.begin().await?;
        let users = tx.users_with_status(UserStatus::Pending).await?;
        tx.commit().await?;

        Ok(users)
    }

    pub async fn signup(
        form: SignupForm,
        session_ttl: Duration,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<SignupOutcome> {
        let (name, email, password) = match (
            non_blank(form.name),
            non_blank(form.email),
            form.password.filter(|password| !password.is_empty()),
        ) {
            (Some(name), Some(email), Some(password)) => (name, email.to_lowercase(), password),
            _ => {
                return Err(HallError::BadRequest(
                    "Please enter your name, email and password.".to_owned(),
                ))
            }
        };
        if !is_valid_email(&email) {
            return Err(HallError::BadRequest(
                "Please enter a valid email address.".to_owned(),
            ));
        }

        let mut tx = store.begin().await?;
        if let Some(existing) = tx.user_with_email(&email).await? {
            return Err(HallError::AlreadyExists(
                if existing.status == UserStatus::Pending {
                    "User with this email has already registered and is awaiting approval."
                } else {
                    "User with this email already exists."
                }
                .to_owned(),
            ));
        }

        let preapproved = tx.preapproved_with_email(&email).await?;
        if preapproved.as_ref().map_or(false, |entry| entry.is_registered) {
            return Err(HallError::AlreadyExists(
                "This pre-approved email has already been registered.".to_owned(),
            ));
        }

        let new_user = NewUser {
            name,
            email,
            pass_hash: hash_password(&password)?,
            role: preapproved.as_ref().map_or(Role::DEFAULT, |entry| entry.role),
            status: if preapproved.is_some() {
                UserStatus::Approved
            } else {
                UserStatus::Pending
            },
        };
        let user = tx.insert_user(&new_user, now).await?;

        let outcome = if preapproved.is_some() {
            tx.mark_preapproved_registered(&user.email).await?;
            let session = Session::new(user.id, session_ttl, now);
            tx.delete_expired_sessions(now).await?;
            tx.insert_session(&session).await?;

            SignupOutcome::LoggedIn { user, session }
        } else {
            SignupOutcome::AwaitingApproval { user }
        };
        tx.commit().await?;

        match &outcome {
            SignupOutcome::LoggedIn { user, .. } => {
                tracing::info!("pre-approved user {} signed up as {}", user.email, user.role)
            }
            SignupOutcome::AwaitingApproval { user } => {
                tracing::info!("user {} signed up and awaits approval", user.email)
            }
        }
        Ok(outcome)
    }

    /// Checks the user's password and opens a new session.
    pub async fn login(
        form: LoginForm,
        session_ttl: Duration,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<(User, Session)> {
        let (email, password) = match (non_blank(form.email), form.password) {
            (Some(email), Some(password)) => (email.to_lowercase(), password),
            _ => return Err(HallError::InvalidCredentials),
        };

        let mut tx = store.begin().await?;
        let user = tx
            .user_with_email(&email)
            .await?
            .ok_or(HallError::InvalidCredentials)?;
        if !verify_password(&password, &user.pass_hash)? {
            return Err(HallError::InvalidCredentials);
        }
        match user.status {
            UserStatus::Approved => {}
            UserStatus::Pending => return Err(HallError::AccountPending),
            UserStatus::Rejected => return Err(HallError::AccountRejected),
        }

        let session = Session::new(user.id, session_ttl, now);
        tx.delete_expired_sessions(now).await?;
        tx.insert_session(&session).await?;
        tx.commit().await?;

        tracing::info!("user {} logged in", user.email);
        Ok((user, session))
    }

    pub async fn approve(id: i32, store: &dyn Store) -> HallResult<User> {
        Self::decide(id, UserStatus::Approved, store).await
    }

    pub async fn reject(id: i32, store: &dyn Store) -> HallResult<User> {
        Self::decide(id, UserStatus::Rejected, store).await
    }

    async fn decide(id: i32, status: UserStatus, store: &dyn Store) -> HallResult<User> {
        let mut tx = store.begin().await?;
        match tx.user_with_id(id).await? {
            Some(user) if user.status == UserStatus::Pending => {}
            _ => {
                return Err(HallError::NotFound(
                    "User not found or not in pending status.".to_owned(),
                ))
            }
        }
        let user = tx.set_user_status(id, status).await?;
        tx.commit().await?;

        tracing::info!("user {} is now {:?}", user.email, user.status);
        Ok(user)
    }

    /// Creates the configured admin account, or resets its password and
    /// permissions if it already exists.
    pub async fn bootstrap_admin(
        account: &AdminAccount,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<User> {
        let new_user = NewUser {
            name: account.name.clone(),
            email: account.email.trim().to_lowercase(),
            pass_hash: hash_password(&account.password)?,
            role: Role::Admin,
            status: UserStatus::Approved,
        };

        let mut tx = store.begin().await?;
        let admin = tx.upsert_user(&new_user, now).await?;
        tx.commit().await?;

        tracing::info!("admin account {} is ready", admin.email);
        Ok(admin)
    }
}
