use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Time};

use crate::error::{HallError, HallResult};

pub mod booking;
pub mod user;

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_WITH_SECONDS_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

pub fn parse_date(value: &str) -> HallResult<Date> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| HallError::BadRequest(format!("Invalid date `{value}`, expected YYYY-MM-DD.")))
}

/// Parses `HH:MM`, also accepting the `HH:MM:SS` that Postgres hands back.
pub fn parse_time(value: &str) -> HallResult<Time> {
    let value = value.trim();
    Time::parse(value, TIME_FORMAT)
        .or_else(|_| Time::parse(value, TIME_WITH_SECONDS_FORMAT))
        .map_err(|_| HallError::BadRequest(format!("Invalid time `{value}`, expected HH:MM.")))
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub fn format_time(time: Time) -> String {
    time.format(TIME_FORMAT).unwrap_or_else(|_| time.to_string())
}

pub mod date_format {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(de::Error::custom)
    }
}

pub mod time_format {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Time;

    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_time(&value).map_err(de::Error::custom)
    }
}
