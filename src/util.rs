//! Extra utilities for use elsewhere in the API.

use std::sync::OnceLock;

use regex::Regex;
use time::OffsetDateTime;

use crate::error::{HallError, HallResult};

const PASSWORD_HASH_COST: u32 = 10;

pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn is_valid_email(address: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
        .is_match(address)
}

pub fn hash_password(password: &str) -> HallResult<String> {
    bcrypt::hash(password, PASSWORD_HASH_COST)
        .map_err(|err| HallError::ServerError(format!("Failed to hash password: {err}")))
}

pub fn verify_password(password: &str, pass_hash: &str) -> HallResult<bool> {
    bcrypt::verify(password, pass_hash)
        .map_err(|err| HallError::ServerError(format!("Failed to verify password: {err}")))
}

/// Trims a submitted field, treating blank input as missing.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
