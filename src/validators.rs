//! Borrowing validation rules
//!
//! Each check takes the error to return on failure so the same rule can back
//! both the lifecycle transitions and request-level validation.

use chrono::NaiveDate;

/// Fails with `error` when the borrowing already has a return date.
pub fn validate_book_not_already_returned<E>(
    actual_return_date: Option<NaiveDate>,
    error: E,
) -> Result<(), E> {
    match actual_return_date {
        Some(_) => Err(error),
        None => Ok(()),
    }
}

/// Fails with `error` when no copy is left to lend.
pub fn validate_book_availability<E>(copies: i32, error: E) -> Result<(), E> {
    if copies <= 0 {
        return Err(error);
    }
    Ok(())
}

/// Fails with `error` when the expected return date lies before the borrow date.
pub fn validate_non_past_return_date<E>(
    borrow_date: NaiveDate,
    expected_return_date: NaiveDate,
    error: E,
) -> Result<(), E> {
    if expected_return_date < borrow_date {
        return Err(error);
    }
    Ok(())
}
