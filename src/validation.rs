//! Request field checks shared by the JSON handlers.

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn email(field: &str, value: &str) -> Result<(), ApiError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_field(field, "must be a valid email address"))
    }
}

/// Character-count bounds, inclusive.
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::invalid_field(
            field,
            &format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

pub fn password(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_field(
            field,
            &format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> Result<(), ApiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::invalid_field(field, "must be zero or greater"))
    }
}
