//! Field rules shared by the create and update paths.
//!
//! Lengths are counted in characters, not bytes, so accented names measure
//! the way users type them.

use std::ops::RangeInclusive;

use crate::error::ValidationError;

pub const NAME_LEN: RangeInclusive<usize> = 3..=255;
pub const BUSINESS_NAME_MAX: usize = 255;
pub const ADDRESS_MIN: usize = 5;
pub const PHONE_MAX: usize = 20;
pub const REASON_MAX: usize = 255;
pub const EMAIL_MAX: usize = 255;

/// Colombia's bounding box.
pub const LATITUDE_RANGE: RangeInclusive<f64> = -5.0..=13.0;
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -80.0..=-66.0;

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Checks a person or store name.
pub fn name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if NAME_LEN.contains(&char_len(value.trim())) {
        Ok(())
    } else {
        Err(ValidationError::Length {
            field,
            min: *NAME_LEN.start(),
            max: *NAME_LEN.end(),
        })
    }
}

/// Checks an optional field against an upper length bound.
pub fn max_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if char_len(v) > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

pub fn address(value: &str) -> Result<(), ValidationError> {
    if char_len(value.trim()) >= ADDRESS_MIN {
        Ok(())
    } else {
        Err(ValidationError::TooShort {
            field: "address",
            min: ADDRESS_MIN,
        })
    }
}

/// Validates an email address and returns it trimmed and lowercased.
///
/// Accepts `local@domain.tld` where neither side is empty, the domain has at
/// least one dot with non-empty labels, and nothing contains whitespace.
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_lowercase();
    let invalid = || ValidationError::Email { field };

    if normalized.is_empty()
        || char_len(&normalized) > EMAIL_MAX
        || normalized.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    if domain.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    Ok(normalized)
}

pub fn latitude(value: f64) -> Result<(), ValidationError> {
    in_range("latitude", value, LATITUDE_RANGE)
}

pub fn longitude(value: f64) -> Result<(), ValidationError> {
    in_range("longitude", value, LONGITUDE_RANGE)
}

fn in_range(
    field: &'static str,
    value: f64,
    range: RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    // NaN fails `contains`, which is what we want.
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Ids arrive from request bodies as plain integers; stored ids start at 1.
pub fn positive_id(field: &'static str, raw: i64) -> Result<(), ValidationError> {
    if raw > 0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveId { field })
    }
}

/// Prices must be finite and above zero.
pub fn positive_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

/// Stock levels and thresholds must be finite and at least zero.
pub fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}
