use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};

use self::conflict::{ensure_no_conflicts, ConflictQuery, TimeSlot};
use crate::config::BookingRules;
use crate::db::Store;
use crate::error::{HallError, HallResult};
use crate::models::user::{Role, User};
use crate::models::{date_format, parse_date, parse_time, time_format};
use crate::util::non_blank;

pub mod conflict;
pub mod status;

pub use self::status::{BookingStatus, Transition};

/// A request for the seminar hall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i32,
    /// The user who requested the booking
    pub user_id: i32,
    /// The club or organization hosting the event
    pub club_name: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "date_format")]
    pub date: Date,
    #[serde(with = "time_format")]
    pub start_time: Time,
    #[serde(with = "time_format")]
    pub end_time: Time,
    pub status: BookingStatus,
    /// Left by the admin who approved or rejected the booking
    pub admin_comments: Option<String>,
    pub terms_accepted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A booking along with who requested it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookingDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub user_name: String,
    pub user_email: String,
    pub user_role: Role,
}

impl BookingDetails {
    pub fn new(booking: Booking, owner: &User) -> Self {
        Self {
            booking,
            user_name: owner.name.clone(),
            user_email: owner.email.clone(),
            user_role: owner.role,
        }
    }
}

/// What the public calendar shows of a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublicBooking {
    pub id: i32,
    pub club_name: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "date_format")]
    pub date: Date,
    #[serde(with = "time_format")]
    pub start_time: Time,
    #[serde(with = "time_format")]
    pub end_time: Time,
    pub status: BookingStatus,
}

impl From<Booking> for PublicBooking {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            club_name: booking.club_name,
            title: booking.title,
            description: booking.description,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
        }
    }
}

/// How many bookings are in each status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookingStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub approved_bookings: i64,
    pub rejected_bookings: i64,
    pub cancelled_bookings: i64,
}

impl BookingStats {
    pub fn count(&mut self, status: BookingStatus) {
        self.total_bookings += 1;
        match status {
            BookingStatus::Pending => self.pending_bookings += 1,
            BookingStatus::Approved => self.approved_bookings += 1,
            BookingStatus::Rejected => self.rejected_bookings += 1,
            BookingStatus::Cancelled => self.cancelled_bookings += 1,
        }
    }
}

/// A booking request as submitted by a club leader or faculty member.
#[derive(Debug, Default, Deserialize)]
pub struct NewBooking {
    #[serde(alias = "clubName")]
    pub club_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "startTime")]
    pub start_time: Option<String>,
    #[serde(alias = "endTime")]
    pub end_time: Option<String>,
    #[serde(alias = "termsAccepted")]
    pub terms_accepted: Option<bool>,
}

/// A validated booking request, ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    pub club_name: String,
    pub title: String,
    pub description: Option<String>,
    pub slot: TimeSlot,
    pub terms_accepted: bool,
}

impl NewBooking {
    pub fn validate(self) -> HallResult<BookingRequest> {
        let (club_name, title, date, start_time, end_time, terms_accepted) = match (
            non_blank(self.club_name),
            non_blank(self.title),
            non_blank(self.date),
            non_blank(self.start_time),
            non_blank(self.end_time),
            self.terms_accepted,
        ) {
            (Some(club), Some(title), Some(date), Some(start), Some(end), Some(terms)) => {
                (club, title, date, start, end, terms)
            }
            _ => {
                return Err(HallError::BadRequest(
                    "Please enter all required fields: Club Name, Title, Date, Start Time, \
                     End Time, and accept terms."
                        .to_owned(),
                ))
            }
        };

        if !terms_accepted {
            return Err(terms_not_accepted());
        }

        let slot = TimeSlot::new(
            parse_date(&date)?,
            parse_time(&start_time)?,
            parse_time(&end_time)?,
        )?;

        Ok(BookingRequest {
            club_name,
            title,
            description: non_blank(self.description),
            slot,
            terms_accepted,
        })
    }
}

/// Changes to a pending booking. Missing fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct BookingUpdate {
    #[serde(alias = "clubName")]
    pub club_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "startTime")]
    pub start_time: Option<String>,
    #[serde(alias = "endTime")]
    pub end_time: Option<String>,
    #[serde(alias = "termsAccepted")]
    pub terms_accepted: Option<bool>,
}

impl BookingUpdate {
    /// Whether the update asks to move the booking in time.
    pub fn moves_slot(&self) -> bool {
        self.date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }

    /// Merges the update into `current`, validating the result.
    pub fn apply_to(self, current: &Booking) -> HallResult<BookingRequest> {
        if self.terms_accepted == Some(false) {
            return Err(terms_not_accepted());
        }

        let slot = TimeSlot::new(
            self.date
                .as_deref()
                .map(parse_date)
                .transpose()?
                .unwrap_or(current.date),
            self.start_time
                .as_deref()
                .map(parse_time)
                .transpose()?
                .unwrap_or(current.start_time),
            self.end_time
                .as_deref()
                .map(parse_time)
                .transpose()?
                .unwrap_or(current.end_time),
        )?;

        Ok(BookingRequest {
            club_name: non_blank(self.club_name).unwrap_or_else(|| current.club_name.clone()),
            title: non_blank(self.title).unwrap_or_else(|| current.title.clone()),
            description: match self.description {
                Some(description) => non_blank(Some(description)),
                None => current.description.clone(),
            },
            slot,
            terms_accepted: self.terms_accepted.unwrap_or(current.terms_accepted),
        })
    }
}

/// What an admin can say when deciding on a booking.
#[derive(Debug, Default, Deserialize)]
pub struct AdminDecision {
    #[serde(default, alias = "adminComments")]
    pub admin_comments: Option<String>,
}

fn terms_not_accepted() -> HallError {
    HallError::BadRequest("You must accept the terms and conditions.".to_owned())
}

fn not_found(id: i32) -> HallError {
    HallError::NotFound(format!("No booking with id {id}"))
}

fn ensure_in_future(slot: &TimeSlot, rules: &BookingRules, now: OffsetDateTime) -> HallResult<()> {
    if slot.starts_at(rules.utc_offset) <= now {
        Err(HallError::BadRequest(
            "Booking date and time must be in the future.".to_owned(),
        ))
    } else {
        Ok(())
    }
}

impl Booking {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub async fn with_id(id: i32, store: &dyn Store) -> HallResult<BookingDetails> {
        let mut tx = store.begin().await?;
        let booking = tx.booking_with_id(id).await?.ok_or_else(|| not_found(id))?;
        tx.commit().await?;

        Ok(booking)
    }

    /// The user's own bookings, newest first.
    pub async fn for_user(user_id: i32, store: &dyn Store) -> HallResult<Vec<Booking>> {
        let mut tx = store.begin().await?;
        let bookings = tx.bookings_for_user(user_id).await?;
        tx.commit().await?;

        Ok(bookings)
    }

    /// Approved bookings from today on, in calendar order.
    pub async fn public_calendar(
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<Vec<PublicBooking>> {
        let today = now.to_offset(rules.utc_offset).date();

        let mut tx = store.begin().await?;
        let bookings = tx.approved_from(today).await?;
        tx.commit().await?;

        Ok(bookings.into_iter().map(PublicBooking::from).collect())
    }

    /// Bookings awaiting a decision, oldest first.
    pub async fn pending(store: &dyn Store) -> HallResult<Vec<BookingDetails>> {
        let mut tx = store.begin().await?;
        let bookings = tx.bookings_with_status(BookingStatus::Pending).await?;
        tx.commit().await?;

        Ok(bookings)
    }

    /// Every booking, newest first.
    pub async fn all(store: &dyn Store) -> HallResult<Vec<BookingDetails>> {
        let mut tx = store.begin().await?;
        let bookings = tx.all_bookings().await?;
        tx.commit().await?;

        Ok(bookings)
    }

    pub async fn stats(store: &dyn Store) -> HallResult<BookingStats> {
        let mut tx = store.begin().await?;
        let stats = tx.booking_stats().await?;
        tx.commit().await?;

        Ok(stats)
    }

    /// Requests the hall, provided the slot is clear of every approved or
    /// pending booking (buffer included).
    pub async fn submit(
        user: &User,
        new_booking: NewBooking,
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<Booking> {
        user.ensure_role(Role::REQUESTERS)?;
        let request = new_booking.validate()?;
        ensure_in_future(&request.slot, rules, now)?;

        let mut tx = store.begin().await?;
        tx.lock_date(request.slot.date).await?;
        let same_day = tx.bookings_on(request.slot.date).await?;
        ensure_no_conflicts(
            &request.slot,
            &same_day,
            ConflictQuery {
                statuses: BookingStatus::ACTIVE,
                exclude: None,
                buffer: rules.buffer,
            },
            &format!(
                "The selected time slot overlaps with an existing approved or pending booking \
                 (including {}-minute buffer). Please choose another time.",
                rules.buffer.whole_minutes()
            ),
        )?;

        let booking = tx.insert_booking(user.id, &request, now).await?;
        tx.commit().await?;

        tracing::info!(
            "booking {} created by user {} for {} {}-{}",
            booking.id,
            user.id,
            booking.date,
            booking.start_time,
            booking.end_time
        );
        Ok(booking)
    }

    /// Edits one of the user's own pending bookings, re-checking for
    /// collisions if it moves.
    pub async fn update(
        id: i32,
        user: &User,
        update: BookingUpdate,
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<Booking> {
        user.ensure_role(Role::REQUESTERS)?;

        let mut tx = store.begin().await?;
        let current = tx
            .booking_with_id(id)
            .await?
            .filter(|details| details.booking.user_id == user.id)
            .ok_or_else(|| not_found(id))?
            .booking;
        if current.status != BookingStatus::Pending {
            return Err(HallError::InvalidStatus {
                current: current.status,
                allowed: "Only pending bookings can be updated.",
            });
        }

        let moves_slot = update.moves_slot();
        let request = update.apply_to(&current)?;
        if moves_slot {
            ensure_in_future(&request.slot, rules, now)?;
            tx.lock_date(request.slot.date).await?;
            let same_day = tx.bookings_on(request.slot.date).await?;
            ensure_no_conflicts(
                &request.slot,
                &same_day,
                ConflictQuery {
                    statuses: BookingStatus::ACTIVE,
                    exclude: Some(id),
                    buffer: rules.buffer,
                },
                "The updated time slot overlaps with an existing booking. \
                 Please choose another time.",
            )?;
        }

        let booking = tx.update_booking(id, &request, now).await?;
        tx.commit().await?;

        tracing::info!("booking {id} updated by user {}", user.id);
        Ok(booking)
    }

    /// Lets the owner take back a booking that hasn't been decided on yet.
    pub async fn withdraw(
        id: i32,
        user: &User,
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<Booking> {
        user.ensure_role(Role::REQUESTERS)?;

        let mut tx = store.begin().await?;
        let current = tx
            .booking_with_id(id)
            .await?
            .filter(|details| details.booking.user_id == user.id)
            .ok_or_else(|| not_found(id))?
            .booking;
        let status = current.status.apply(
            Transition::Withdraw,
            current.slot().starts_at(rules.utc_offset),
            now,
            rules.cancellation_notice,
        )?;

        let booking = tx
            .set_booking_status(id, status, current.admin_comments.as_deref(), now)
            .await?;
        tx.commit().await?;

        tracing::info!("booking {id} withdrawn by user {}", user.id);
        Ok(booking)
    }

    /// Approves a pending booking unless an approved booking already holds
    /// an overlapping slot.
    pub async fn approve(
        id: i32,
        decision: AdminDecision,
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<BookingDetails> {
        let mut tx = store.begin().await?;
        let current = tx.booking_with_id(id).await?.ok_or_else(|| not_found(id))?;
        let slot = current.booking.slot();
        let status = current.booking.status.apply(
            Transition::Approve,
            slot.starts_at(rules.utc_offset),
            now,
            rules.cancellation_notice,
        )?;

        tx.lock_date(slot.date).await?;
        let same_day = tx.bookings_on(slot.date).await?;
        ensure_no_conflicts(
            &slot,
            &same_day,
            ConflictQuery {
                statuses: BookingStatus::CONFIRMED,
                exclude: Some(id),
                buffer: rules.buffer,
            },
            "Cannot approve: This time slot conflicts with an already approved booking.",
        )?;

        let comments = non_blank(decision.admin_comments);
        let booking = tx
            .set_booking_status(id, status, comments.as_deref(), now)
            .await?;
        tx.commit().await?;

        tracing::info!("booking {id} approved");
        Ok(BookingDetails { booking, ..current })
    }

    /// Rejects a pending booking, or cancels an approved one that is still
    /// far enough away.
    pub async fn reject(
        id: i32,
        decision: AdminDecision,
        rules: &BookingRules,
        now: OffsetDateTime,
        store: &dyn Store,
    ) -> HallResult<BookingDetails> {
        let mut tx = store.begin().await?;
        let current = tx.booking_with_id(id).await?.ok_or_else(|| not_found(id))?;
        let previous = current.booking.status;
        let status = previous.apply(
            Transition::Reject,
            current.booking.slot().starts_at(rules.utc_offset),
            now,
            rules.cancellation_notice,
        )?;

        let comments = non_blank(decision.admin_comments);
        let booking = tx
            .set_booking_status(id, status, comments.as_deref(), now)
            .await?;
        tx.commit().await?;

        tracing::info!("booking {id} rejected (was {previous})");
        Ok(BookingDetails { booking, ..current })
    }
}
