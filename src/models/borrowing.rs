//! Borrowing model and the borrow/return lifecycle

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::Book;
use crate::{
    error::{AppError, AppResult},
    validators::{
        validate_book_availability, validate_book_not_already_returned,
        validate_non_past_return_date,
    },
};

/// Borrowing row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Borrowing {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub is_active: bool,
}

/// A borrowing validated and ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrowing {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
}

impl NewBorrowing {
    /// Open a borrowing of `book` for `user_id`, taking one copy off the shelf.
    ///
    /// All checks run before `book` is touched, so on error the book is
    /// left exactly as it was.
    pub fn open(
        user_id: i32,
        book: &mut Book,
        expected_return_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Self> {
        validate_book_availability(book.copies, AppError::BookUnavailable)?;
        validate_non_past_return_date(today, expected_return_date, AppError::InvalidReturnDate)?;

        book.borrow_one_copy()?;

        Ok(Self {
            user_id,
            book_id: book.id,
            borrow_date: today,
            expected_return_date,
        })
    }
}

impl Borrowing {
    /// Close the borrowing and put the copy back on the shelf.
    pub fn close(&mut self, book: &mut Book, today: NaiveDate) -> AppResult<()> {
        validate_book_not_already_returned(self.actual_return_date, AppError::AlreadyReturned)?;
        if book.id != self.book_id {
            return Err(AppError::Internal(format!(
                "Borrowing {} refers to book {}, got book {}",
                self.id, self.book_id, book.id
            )));
        }

        book.return_one_copy()?;
        self.actual_return_date = Some(today);
        self.is_active = false;
        Ok(())
    }
}

/// Borrowing with its book resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub user_id: i32,
    pub book: Book,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl BorrowingDetails {
    pub fn new(borrowing: Borrowing, book: Book) -> Self {
        Self {
            id: borrowing.id,
            user_id: borrowing.user_id,
            book,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
            is_active: borrowing.is_active,
        }
    }
}

/// Create borrowing request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowing {
    /// Book ID
    #[validate(range(min = 1, message = "Invalid book id"))]
    pub book: i32,
    /// Date the book is due back (YYYY-MM-DD)
    pub expected_return_date: NaiveDate,
}

/// Borrowing list filters
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    /// Only open (true) or only returned (false) borrowings
    pub is_active: Option<bool>,
    /// Restrict to one user (staff only)
    pub user_id: Option<i32>,
}
