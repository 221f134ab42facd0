use askama::Template;

use crate::email::{Email, Recipient};
use crate::models::booking::{Booking, BookingDetails, BookingStatus};
use crate::models::user::User;
use crate::models::{format_date, format_time};

/// Tells the admin a new booking is waiting for review.
#[derive(Template)]
#[template(path = "new-booking.html")]
pub struct NewBookingEmail<'a> {
    pub admin_address: &'a str,
    pub requester: &'a User,
    pub booking: &'a Booking,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub review_url: String,
}

impl<'a> NewBookingEmail<'a> {
    pub fn new(
        admin_address: &'a str,
        requester: &'a User,
        booking: &'a Booking,
        frontend_url: &str,
    ) -> Self {
        Self {
            admin_address,
            requester,
            booking,
            date: format_date(booking.date),
            start_time: format_time(booking.start_time),
            end_time: format_time(booking.end_time),
            review_url: format!("{}/admin", frontend_url.trim_end_matches('/')),
        }
    }
}

impl<'a> Email for NewBookingEmail<'a> {
    fn subject(&self) -> String {
        format!(
            "New Booking Request: {} by {}",
            self.booking.title, self.booking.club_name
        )
    }

    fn recipient(&self) -> Recipient {
        Recipient::address(self.admin_address)
    }
}

/// Tells the requester their booking was approved or rejected.
#[derive(Template)]
#[template(path = "booking-decision.html")]
pub struct BookingDecisionEmail<'a> {
    pub details: &'a BookingDetails,
    pub approved: bool,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub bookings_url: String,
}

impl<'a> BookingDecisionEmail<'a> {
    pub fn new(details: &'a BookingDetails, frontend_url: &str) -> Self {
        let booking = &details.booking;
        Self {
            details,
            approved: booking.status == BookingStatus::Approved,
            date: format_date(booking.date),
            start_time: format_time(booking.start_time),
            end_time: format_time(booking.end_time),
            bookings_url: format!("{}/bookings", frontend_url.trim_end_matches('/')),
        }
    }
}

impl<'a> Email for BookingDecisionEmail<'a> {
    fn subject(&self) -> String {
        let outcome = if self.approved { "Approved" } else { "Rejected" };
        format!("Booking {outcome}: {}", self.details.booking.title)
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.details.user_name, &self.details.user_email)
    }
}
