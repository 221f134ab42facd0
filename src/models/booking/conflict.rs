//! Detecting bookings that collide in the hall.
//!
//! Two bookings on the same date collide when one starts before the other
//! ends plus the buffer, and ends after the other starts minus the buffer.
//! The buffer is the mandatory gap between any two events. Times are compared
//! as offsets into the day, so a buffer may reach past midnight on either side
//! without wrapping around.

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use super::{Booking, BookingStatus};
use crate::error::{HallError, HallResult};
use crate::models::{date_format, time_format};

pub const DEFAULT_BUFFER: Duration = Duration::minutes(60);

/// A span of time on a single day in the hall's local time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: Date,
    pub start: Time,
    pub end: Time,
}

impl TimeSlot {
    /// Builds a slot, requiring it to end strictly after it starts.
    pub fn new(date: Date, start: Time, end: Time) -> HallResult<Self> {
        if start >= end {
            return Err(HallError::BadRequest(
                "End time must be after start time.".to_owned(),
            ));
        }

        Ok(Self { date, start, end })
    }

    /// Whether this slot, padded by `buffer` on both sides, intersects `other`.
    pub fn collides_with(&self, other: &TimeSlot, buffer: Duration) -> bool {
        if self.date != other.date {
            return false;
        }

        let buffer = buffer.whole_seconds();
        other.start_offset() < self.end_offset() + buffer
            && other.end_offset() > self.start_offset() - buffer
    }

    /// When the slot begins, given the hall's UTC offset.
    pub fn starts_at(&self, offset: UtcOffset) -> OffsetDateTime {
        PrimitiveDateTime::new(self.date, self.start).assume_offset(offset)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    fn start_offset(&self) -> i64 {
        seconds_into_day(self.start)
    }

    fn end_offset(&self) -> i64 {
        seconds_into_day(self.end)
    }
}

fn seconds_into_day(time: Time) -> i64 {
    let (hour, minute, second) = time.as_hms();
    i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second)
}

/// The public summary of a booking that blocked a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictingBooking {
    pub id: i32,
    pub title: String,
    pub club_name: String,
    #[serde(with = "date_format")]
    pub date: Date,
    #[serde(with = "time_format")]
    pub start_time: Time,
    #[serde(with = "time_format")]
    pub end_time: Time,
    pub status: BookingStatus,
}

impl From<&Booking> for ConflictingBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            title: booking.title.clone(),
            club_name: booking.club_name.clone(),
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
        }
    }
}

/// Which existing bookings a candidate slot is checked against.
#[derive(Clone, Copy, Debug)]
pub struct ConflictQuery<'a> {
    /// Only bookings in one of these statuses can collide.
    pub statuses: &'a [BookingStatus],
    /// A booking that never collides with the candidate, i.e. itself.
    pub exclude: Option<i32>,
    pub buffer: Duration,
}

/// Collects every booking in `existing` that collides with `candidate`.
pub fn find_conflicts<'b>(
    candidate: &TimeSlot,
    existing: impl IntoIterator<Item = &'b Booking>,
    query: ConflictQuery<'_>,
) -> Vec<ConflictingBooking> {
    existing
        .into_iter()
        .filter(|booking| Some(booking.id) != query.exclude)
        .filter(|booking| query.statuses.contains(&booking.status))
        .filter(|booking| booking.slot().collides_with(candidate, query.buffer))
        .map(ConflictingBooking::from)
        .collect()
}

/// Fails with [`HallError::Conflict`] if `candidate` collides with anything.
pub fn ensure_no_conflicts<'b>(
    candidate: &TimeSlot,
    existing: impl IntoIterator<Item = &'b Booking>,
    query: ConflictQuery<'_>,
    message: &str,
) -> HallResult<()> {
    let conflicting = find_conflicts(candidate, existing, query);
    if conflicting.is_empty() {
        Ok(())
    } else {
        tracing::info!(
            "slot {} {}-{} collides with bookings {:?}",
            candidate.date,
            candidate.start,
            candidate.end,
            conflicting.iter().map(|booking| booking.id).collect::<Vec<_>>()
        );
        Err(HallError::Conflict {
            message: message.to_owned(),
            conflicting,
        })
    }
}
