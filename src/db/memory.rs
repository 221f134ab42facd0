//! A store that keeps everything in memory, for tests and local demos.
//!
//! Transactions take turns: each one holds the only lock on the tables until
//! it commits or is dropped, and works on a copy that only replaces the tables
//! on commit.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::error::{HallError, HallResult};
use crate::models::booking::{
    Booking, BookingDetails, BookingRequest, BookingStats, BookingStatus,
};
use crate::models::user::preapproved::PreapprovedUser;
use crate::models::user::session::Session;
use crate::models::user::{NewUser, Role, User, UserStatus};

#[derive(Clone, Debug, Default)]
struct Tables {
    users: Vec<User>,
    preapproved: Vec<PreapprovedUser>,
    sessions: Vec<Session>,
    bookings: Vec<Booking>,
    last_user_id: i32,
    last_preapproved_id: i32,
    last_booking_id: i32,
}

impl Tables {
    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        self.users
            .iter()
            .find(|user| user.id == booking.user_id)
            .map(|owner| BookingDetails::new(booking.clone(), owner))
    }

    fn user_mut(&mut self, id: i32) -> HallResult<&mut User> {
        self.users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or_else(|| missing_row("users", id))
    }

    fn booking_mut(&mut self, id: i32) -> HallResult<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|booking| booking.id == id)
            .ok_or_else(|| missing_row("bookings", id))
    }
}

fn missing_row(table: &str, id: i32) -> HallError {
    HallError::ServerError(format!("no row in `{table}` with id {id}"))
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> HallResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTx { guard, working }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn user_with_id(&mut self, id: i32) -> HallResult<Option<User>> {
        Ok(self.working.users.iter().find(|user| user.id == id).cloned())
    }

    async fn user_with_email(&mut self, email: &str) -> HallResult<Option<User>> {
        Ok(self
            .working
            .users
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn users_with_status(&mut self, status: UserStatus) -> HallResult<Vec<User>> {
        Ok(self
            .working
            .users
            .iter()
            .filter(|user| user.status == status)
            .cloned()
            .collect())
    }

    async fn insert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User> {
        if self.working.users.iter().any(|other| other.email == user.email) {
            return Err(HallError::ServerError(format!(
                "duplicate email `{}` in `users`",
                user.email
            )));
        }

        self.working.last_user_id += 1;
        let user = User {
            id: self.working.last_user_id,
            name: user.name.clone(),
            email: user.email.clone(),
            pass_hash: user.pass_hash.clone(),
            role: user.role,
            status: user.status,
            created_at: now,
        };
        self.working.users.push(user.clone());

        Ok(user)
    }

    async fn upsert_user(&mut self, user: &NewUser, now: OffsetDateTime) -> HallResult<User> {
        match self
            .working
            .users
            .iter_mut()
            .find(|other| other.email == user.email)
        {
            Some(existing) => {
                existing.name = user.name.clone();
                existing.pass_hash = user.pass_hash.clone();
                existing.role = user.role;
                existing.status = user.status;
                Ok(existing.clone())
            }
            None => self.insert_user(user, now).await,
        }
    }

    async fn set_user_status(&mut self, id: i32, status: UserStatus) -> HallResult<User> {
        let user = self.working.user_mut(id)?;
        user.status = status;

        Ok(user.clone())
    }

    async fn preapproved_with_email(
        &mut self,
        email: &str,
    ) -> HallResult<Option<PreapprovedUser>> {
        Ok(self
            .working
            .preapproved
            .iter()
            .find(|entry| entry.email == email)
            .cloned())
    }

    async fn all_preapproved(&mut self) -> HallResult<Vec<PreapprovedUser>> {
        let mut entries = self.working.preapproved.clone();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(entries)
    }

    async fn insert_preapproved(
        &mut self,
        name: &str,
        email: &str,
        role: Role,
        now: OffsetDateTime,
    ) -> HallResult<PreapprovedUser> {
        self.working.last_preapproved_id += 1;
        let entry = PreapprovedUser {
            id: self.working.last_preapproved_id,
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            is_registered: false,
            created_at: now,
        };
        self.working.preapproved.push(entry.clone());

        Ok(entry)
    }

    async fn mark_preapproved_registered(&mut self, email: &str) -> HallResult<()> {
        for entry in &mut self.working.preapproved {
            if entry.email == email {
                entry.is_registered = true;
            }
        }

        Ok(())
    }

    async fn delete_preapproved(&mut self, id: i32) -> HallResult<bool> {
        let before = self.working.preapproved.len();
        self.working.preapproved.retain(|entry| entry.id != id);

        Ok(self.working.preapproved.len() < before)
    }

    async fn insert_session(&mut self, session: &Session) -> HallResult<()> {
        self.working.sessions.push(session.clone());
        Ok(())
    }

    async fn session_with_token(&mut self, token: &str) -> HallResult<Option<Session>> {
        Ok(self
            .working
            .sessions
            .iter()
            .find(|session| session.token == token)
            .cloned())
    }

    async fn delete_sessions_for(&mut self, user_id: i32) -> HallResult<()> {
        self.working.sessions.retain(|session| session.user_id != user_id);
        Ok(())
    }

    async fn delete_expired_sessions(&mut self, now: OffsetDateTime) -> HallResult<()> {
        self.working.sessions.retain(|session| !session.is_expired(now));
        Ok(())
    }

    async fn lock_date(&mut self, _date: Date) -> HallResult<()> {
        // the whole store is already locked
        Ok(())
    }

    async fn booking_with_id(&mut self, id: i32) -> HallResult<Option<BookingDetails>> {
        Ok(self
            .working
            .bookings
            .iter()
            .find(|booking| booking.id == id)
            .and_then(|booking| self.working.details(booking)))
    }

    async fn bookings_on(&mut self, date: Date) -> HallResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .working
            .bookings
            .iter()
            .filter(|booking| booking.date == date)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.start_time);

        Ok(bookings)
    }

    async fn bookings_for_user(&mut self, user_id: i32) -> HallResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .working
            .bookings
            .iter()
            .filter(|booking| booking.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| (booking.created_at, booking.id));
        bookings.reverse();

        Ok(bookings)
    }

    async fn bookings_with_status(
        &mut self,
        status: BookingStatus,
    ) -> HallResult<Vec<BookingDetails>> {
        let mut bookings: Vec<BookingDetails> = self
            .working
            .bookings
            .iter()
            .filter(|booking| booking.status == status)
            .filter_map(|booking| self.working.details(booking))
            .collect();
        bookings.sort_by_key(|details| (details.booking.created_at, details.booking.id));

        Ok(bookings)
    }

    async fn all_bookings(&mut self) -> HallResult<Vec<BookingDetails>> {
        let mut bookings: Vec<BookingDetails> = self
            .working
            .bookings
            .iter()
            .filter_map(|booking| self.working.details(booking))
            .collect();
        bookings.sort_by_key(|details| (details.booking.created_at, details.booking.id));
        bookings.reverse();

        Ok(bookings)
    }

    async fn approved_from(&mut self, date: Date) -> HallResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .working
            .bookings
            .iter()
            .filter(|booking| booking.status == BookingStatus::Approved && booking.date >= date)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| (booking.date, booking.start_time));

        Ok(bookings)
    }

    async fn booking_stats(&mut self) -> HallResult<BookingStats> {
        let mut stats = BookingStats::default();
        for booking in &self.working.bookings {
            stats.count(booking.status);
        }

        Ok(stats)
    }

    async fn insert_booking(
        &mut self,
        user_id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        self.working.last_booking_id += 1;
        let booking = Booking {
            id: self.working.last_booking_id,
            user_id,
            club_name: request.club_name.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            date: request.slot.date,
            start_time: request.slot.start,
            end_time: request.slot.end,
            status: BookingStatus::Pending,
            admin_comments: None,
            terms_accepted: request.terms_accepted,
            created_at: now,
            updated_at: now,
        };
        self.working.bookings.push(booking.clone());

        Ok(booking)
    }

    async fn update_booking(
        &mut self,
        id: i32,
        request: &BookingRequest,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        let booking = self.working.booking_mut(id)?;
        booking.club_name = request.club_name.clone();
        booking.title = request.title.clone();
        booking.description = request.description.clone();
        booking.date = request.slot.date;
        booking.start_time = request.slot.start;
        booking.end_time = request.slot.end;
        booking.terms_accepted = request.terms_accepted;
        booking.updated_at = now;

        Ok(booking.clone())
    }

    async fn set_booking_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        admin_comments: Option<&str>,
        now: OffsetDateTime,
    ) -> HallResult<Booking> {
        let booking = self.working.booking_mut(id)?;
        booking.status = status;
        booking.admin_comments = admin_comments.map(ToOwned::to_owned);
        booking.updated_at = now;

        Ok(booking.clone())
    }

    async fn commit(self: Box<Self>) -> HallResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;

        Ok(())
    }
}
