//! Runtime configuration, read from the environment (and `.env`).

use std::ops::RangeInclusive;

use anyhow::{anyhow, Context, Result};
use time::format_description::FormatItem;
use time::macros::{format_description, offset};
use time::{Duration, UtcOffset};

use crate::models::booking::conflict::DEFAULT_BUFFER;

const MINUTES_PER_DAY: i64 = 24 * 60;
const HOURS_PER_YEAR: i64 = 365 * 24;

const OFFSET_FORMAT: &[FormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rules: BookingRules,
    /// How long a login token stays valid
    pub session_ttl: Duration,
    pub mail: MailConfig,
    /// An admin account to create (or reset) on startup
    pub bootstrap_admin: Option<AdminAccount>,
}

/// The knobs of the booking workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingRules {
    /// The gap required between any two bookings
    pub buffer: Duration,
    /// How far ahead an approved booking has to be cancelled
    pub cancellation_notice: Duration,
    /// The hall's local offset from UTC, which booking times are given in
    pub utc_offset: UtcOffset,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
            cancellation_notice: Duration::hours(24),
            utc_offset: offset!(+5:30),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MailConfig {
    pub mailgun: Option<MailgunConfig>,
    pub from_name: String,
    pub from_address: String,
    /// Where new booking requests and signups are announced
    pub admin_email: Option<String>,
    /// Linked from emails so recipients can log in
    pub frontend_url: String,
}

#[derive(Clone, Debug)]
pub struct MailgunConfig {
    pub token: String,
    pub domain: String,
}

#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let number = |key: &str, default: i64| -> Result<i64> {
            var(key)
                .map(|value| {
                    value
                        .trim()
                        .parse::<i64>()
                        .with_context(|| format!("`{key}` must be a whole number"))
                })
                .unwrap_or(Ok(default))
        };

        let database_url = var("DATABASE_URL").context("`DATABASE_URL` not set")?;
        let port = u16::try_from(number("PORT", 5000)?).context("`PORT` out of range")?;

        let defaults = BookingRules::default();
        let utc_offset = match var("HALL_UTC_OFFSET") {
            Some(offset) => parse_utc_offset(&offset)?,
            None => defaults.utc_offset,
        };
        let rules = BookingRules {
            buffer: Duration::minutes(bounded(
                "BOOKING_BUFFER_MINUTES",
                number("BOOKING_BUFFER_MINUTES", defaults.buffer.whole_minutes())?,
                0..=MINUTES_PER_DAY,
            )?),
            cancellation_notice: Duration::hours(bounded(
                "CANCELLATION_NOTICE_HOURS",
                number(
                    "CANCELLATION_NOTICE_HOURS",
                    defaults.cancellation_notice.whole_hours(),
                )?,
                0..=HOURS_PER_YEAR,
            )?),
            utc_offset,
        };
        let session_ttl = Duration::hours(bounded(
            "SESSION_TTL_HOURS",
            number("SESSION_TTL_HOURS", 1)?,
            1..=HOURS_PER_YEAR,
        )?);

        let mailgun = match (var("MAILGUN_TOKEN"), var("MAILGUN_DOMAIN")) {
            (Some(token), Some(domain)) => Some(MailgunConfig { token, domain }),
            (Some(_), None) => return Err(anyhow!("`MAILGUN_TOKEN` set without `MAILGUN_DOMAIN`")),
            _ => None,
        };
        let from_address = var("MAIL_FROM_ADDRESS").unwrap_or_else(|| match &mailgun {
            Some(mailgun) => format!("mail@{}", mailgun.domain),
            None => "noreply@localhost".to_owned(),
        });
        let mail = MailConfig {
            mailgun,
            from_address,
            from_name: var("MAIL_FROM_NAME").unwrap_or_else(|| "Seminar Hall Booking".to_owned()),
            admin_email: var("ADMIN_EMAIL"),
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned()),
        };

        let bootstrap_admin = match (
            var("BOOTSTRAP_ADMIN_EMAIL"),
            var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(AdminAccount {
                name: var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_owned()),
                email,
                password,
            }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "`BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD` must be set together"
                ))
            }
        };

        Ok(Self {
            database_url,
            port,
            rules,
            session_ttl,
            mail,
            bootstrap_admin,
        })
    }
}

fn bounded(key: &str, value: i64, range: RangeInclusive<i64>) -> Result<i64> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(anyhow!(
            "`{key}` must be between {} and {}",
            range.start(),
            range.end()
        ))
    }
}

pub fn parse_utc_offset(value: &str) -> Result<UtcOffset> {
    UtcOffset::parse(value.trim(), OFFSET_FORMAT)
        .with_context(|| format!("`{value}` is not a UTC offset like +05:30"))
}
