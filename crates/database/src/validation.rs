//! Input validation for order and settings fields.

use std::fmt;

use chrono::NaiveDate;

use crate::models::{Commission, CommissionType, NewOrder, OrderTerms};

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Date is not `YYYY-MM-DD`.
    InvalidDate(String),
    /// Time is not one of the bookable slots.
    UnknownSlot(String),
    /// Rating outside 1..=5.
    RatingOutOfRange(i64),
    /// Negative or non-finite money amount.
    InvalidAmount { field: &'static str, value: f64 },
    /// Empty value where one is required.
    Empty(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDate(value) => {
                write!(f, "Invalid date '{}', expected YYYY-MM-DD", value)
            }
            ValidationError::UnknownSlot(value) => write!(f, "Unknown time slot '{}'", value),
            ValidationError::RatingOutOfRange(value) => {
                write!(f, "Rating {} is out of range (1-5)", value)
            }
            ValidationError::InvalidAmount { field, value } => {
                write!(f, "{} must be a non-negative amount, got {}", field, value)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Bookable time slots, in display order.
pub const TIME_SLOTS: [&str; 4] = ["9:00 - 12:00", "12:00 - 15:00", "15:00 - 18:00", "18:00 - 21:00"];

/// Date format used for `selected_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate an order date (`YYYY-MM-DD`).
pub fn validate_order_date(date: &str) -> Result<NaiveDate, ValidationError> {
    let date = date.trim();
    if date.is_empty() {
        return Err(ValidationError::Empty("selected_date"));
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))
}

/// Validate that a time is one of [`TIME_SLOTS`].
pub fn validate_time_slot(slot: &str) -> Result<(), ValidationError> {
    if slot.trim().is_empty() {
        return Err(ValidationError::Empty("selected_time"));
    }
    if TIME_SLOTS.contains(&slot) {
        Ok(())
    } else {
        Err(ValidationError::UnknownSlot(slot.to_string()))
    }
}

/// Validate a client rating.
pub fn validate_rating(rating: i64) -> Result<(), ValidationError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange(rating))
    }
}

fn validate_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidAmount { field, value })
    }
}

/// Validate a commission setting. Percentages are capped at 100.
pub fn validate_commission(commission: &Commission) -> Result<(), ValidationError> {
    validate_amount("commission_value", commission.commission_value)?;
    if commission.commission_type == CommissionType::Percent && commission.commission_value > 100.0
    {
        return Err(ValidationError::InvalidAmount {
            field: "commission_value",
            value: commission.commission_value,
        });
    }
    Ok(())
}

/// Validate the editable scope of an order.
pub fn validate_terms(terms: &OrderTerms) -> Result<(), ValidationError> {
    validate_order_date(&terms.selected_date)?;
    validate_time_slot(&terms.selected_time)?;
    validate_amount("total_price", terms.total_price)
}

/// Validate a freshly submitted order.
pub fn validate_new_order(order: &NewOrder) -> Result<(), ValidationError> {
    validate_order_date(&order.selected_date)?;
    validate_time_slot(&order.selected_time)?;
    validate_amount("total_price", order.total_price)
}
