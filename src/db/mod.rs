//! Storage for users, sessions and bookings.
//!
//! Every operation runs against a [`StoreTx`], a transaction opened with
//! [`Store::begin`]. Nothing a transaction writes is visible to anyone else
//! until it is committed, and dropping one without committing rolls it back.

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::error::HallResult;
use crate::models::booking::{
    Booking, BookingDetails, BookingRequest, BookingStats, BookingStatus,
};
use crate::models::user::preapproved::PreapprovedUser;
use crate::models::user::session::Session;
use crate::models::user::{NewUser, Role, User, UserStatus};

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> HallResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn user_with_id(&mut self, id: i32) -> HallResult<Option<User>>;
    async fn user_with_email(&mut self, email: &str) -> HallResult<Option<User>>;
    /// Ordered by id.
    async fn users_with_status(&mut self, status: UserStatus) -> HallResult<Vec<User>>;
    async fn insert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User>;
    /// Inserts the user, or overwrites everything but the id of the user with
    /// the same email.
    async fn upsert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User>;
    async fn set_user_status(&mut self, id: i32, status: UserStatus) -> HallResult<User>;

    async fn preapproved_with_email(&mut self, email: &str)
        -> HallResult<Option<PreapprovedUser>>;
    async fn all_preapproved(&mut self) -> HallResult<Vec<PreapprovedUser>>;
    async fn insert_preapproved(
        &mut self,
        name: &str,
        email: &str,
        role: Role,
        now: OffsetDateTime,
    ) -> HallResult<PreapprovedUser>;
    async fn mark_preapproved_registered(&mut self, email: &str) -> HallResult<()>;
    /// Returns whether there was an entry to delete.
    async fn delete_preapproved(&mut self, id: i32) -> HallResult<bool>;

    async fn insert_session(&mut self, session: &Session) -> HallResult<()>;
    async fn session_with_token(&mut self, token: &str) -> HallResult<Option<Session>>;
    async fn delete_sessions_for(&mut self, user_id: i32) -> HallResult<()>;
    /// Drops every session that has expired by `now`.
    async fn delete_expired_sessions(&mut self, now: OffsetDateTime) -> HallResult<()>;

    /// Holds off every other transaction that locks the same date until this
    /// one ends, so conflict checks and the writes they guard don't interleave.
    async fn lock_date(&mut self, date: Date) -> HallResult<()>;
    async fn booking_with_id(&mut self, id: i32) -> HallResult<Option<BookingDetails>>;
    /// Every booking on `date`, whatever its status.
    async fn bookings_on(&mut self, date: Date) -> HallResult<Vec<Booking>>;
    /// Newest first.
    async fn bookings_for_user(&mut self, user_id: i32) -> HallResult<Vec<Booking>>;
    /// Oldest first.
    async fn bookings_with_status(
        &mut self,
        status: BookingStatus,
    ) -> HallResult<Vec<BookingDetails>>;
    /// Newest first.
    async fn all_bookings(&mut self) -> HallResult<Vec<BookingDetails>>;
    /// Approved bookings on or after `date`, by date then start time.
    async fn approved_from(&mut self, date: Date) -> HallResult<Vec<Booking>>;
    async fn booking_stats(&mut self) -> HallResult<BookingStats>;
    async fn insert_booking(
        &mut self,
        user_id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking>;
    async fn update_booking(
        &mut self,
        id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking>;
    async fn set_booking_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        admin_comments: Option<&str>,
        now: OffsetDateTime,
    ) -> HallResult<Booking>;

    async fn commit(self: Box<Self>) -> HallResult<()>;
}
