//! Derived-age and password rules shared by every account-bearing entity.

use crate::error::AppError;
use chrono::{Datelike, NaiveDate};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whole years between `birth` and `today`: calendar-year difference, one less
/// when today's month/day falls before the birthday's.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
