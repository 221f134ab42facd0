//! The lifecycle of a booking.
//!
//! Bookings start out `pending`. An admin either approves or rejects them, and
//! the owner may withdraw a booking while it is still pending. Rejecting an
//! approved booking is how admins cancel it, which is only allowed while the
//! event is far enough away. `rejected` and `cancelled` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{HallError, HallResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that hold on to their slot in the hall.
    pub const ACTIVE: &'static [BookingStatus] = &[BookingStatus::Approved, BookingStatus::Pending];
    /// Statuses a pending booking must not collide with to be approved.
    pub const CONFIRMED: &'static [BookingStatus] = &[BookingStatus::Approved];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }

    /// Decides whether `transition` may be applied to a booking currently in
    /// this status, returning the status it moves to.
    ///
    /// `starts_at` is when the booked event begins and `now` the time of the
    /// request; they only matter when rejecting an approved booking, which
    /// must happen strictly more than `notice` ahead of the start.
    pub fn apply(
        self,
        transition: Transition,
        starts_at: OffsetDateTime,
        now: OffsetDateTime,
        notice: Duration,
    ) -> HallResult<BookingStatus> {
        use BookingStatus::*;

        match (transition, self) {
            (Transition::Approve, Pending) => Ok(Approved),
            (Transition::Approve, current) => Err(HallError::InvalidStatus {
                current,
                allowed: "Only 'pending' bookings can be approved.",
            }),

            (Transition::Reject, Pending) => Ok(Rejected),
            (Transition::Reject, Approved) => {
                if now < starts_at - notice {
                    Ok(Rejected)
                } else {
                    Err(HallError::CancellationTooLate {
                        notice_hours: notice.whole_hours(),
                    })
                }
            }
            (Transition::Reject, current) => Err(HallError::InvalidStatus {
                current,
                allowed: "Only 'pending' or 'approved' bookings can be cancelled.",
            }),

            (Transition::Withdraw, Pending) => Ok(Cancelled),
            (Transition::Withdraw, current) => Err(HallError::InvalidStatus {
                current,
                allowed: "Only 'pending' bookings can be withdrawn.",
            }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change of status someone can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// An admin accepts a pending booking.
    Approve,
    /// An admin turns down a pending booking or cancels an approved one.
    Reject,
    /// The owner takes back their own pending booking.
    Withdraw,
}
