//! Borrowing lifecycle service

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{BorrowingDetails, BorrowingQuery, CreateBorrowing},
        user::UserClaims,
    },
    repository::BorrowingStore,
};

use super::telegram::Notifier;

/// The server's local calendar date
fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Errors that reject the request itself rather than signal a failure
fn is_refusal(error: &AppError) -> bool {
    matches!(
        error,
        AppError::BookUnavailable
            | AppError::InvalidReturnDate
            | AppError::AlreadyReturned
            | AppError::NotFound(_)
    )
}

#[derive(Clone)]
pub struct BorrowingsService {
    store: Arc<dyn BorrowingStore>,
    notifier: Arc<dyn Notifier>,
}

impl BorrowingsService {
    pub fn new(store: Arc<dyn BorrowingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// List borrowings visible to the caller
    pub async fn list(
        &self,
        claims: &UserClaims,
        query: BorrowingQuery,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let query = if claims.is_staff {
            query
        } else {
            BorrowingQuery {
                user_id: Some(claims.user_id),
                ..query
            }
        };
        self.store.list(&query).await
    }

    /// Get a borrowing the caller is allowed to see
    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<BorrowingDetails> {
        let borrowing = self.store.get_by_id(id).await?;
        if !claims.can_access(borrowing.user_id) {
            // Other users' borrowings are reported as missing
            return Err(AppError::NotFound(format!("Borrowing with id {} not found", id)));
        }
        Ok(borrowing)
    }

    /// Borrow a book for the caller
    pub async fn create(
        &self,
        claims: &UserClaims,
        request: CreateBorrowing,
    ) -> AppResult<BorrowingDetails> {
        request.validate()?;

        let borrowing = self
            .store
            .create(claims.user_id, request.book, request.expected_return_date, today())
            .await
            .map_err(|e| {
                if is_refusal(&e) {
                    tracing::info!(
                        user_id = claims.user_id,
                        book_id = request.book,
                        "Borrowing refused: {}",
                        e
                    );
                }
                e
            })?;

        tracing::info!(
            borrowing_id = borrowing.id,
            user_id = borrowing.user_id,
            book_id = borrowing.book.id,
            copies_left = borrowing.book.copies,
            "Borrowing created"
        );

        self.notifier
            .send_message(&format!(
                "New borrowing #{}: user {} borrowed \"{}\" until {}",
                borrowing.id,
                borrowing.user_id,
                borrowing.book.title,
                borrowing.expected_return_date
            ))
            .await?;

        Ok(borrowing)
    }

    /// Return a borrowed book
    pub async fn return_borrowing(
        &self,
        claims: &UserClaims,
        id: i32,
    ) -> AppResult<BorrowingDetails> {
        self.get(claims, id).await?;

        let borrowing = self.store.return_borrowing(id, today()).await?;

        tracing::info!(
            borrowing_id = borrowing.id,
            book_id = borrowing.book.id,
            copies_left = borrowing.book.copies,
            "Borrowing returned"
        );

        self.notifier
            .send_message(&format!(
                "Borrowing #{} returned: \"{}\" by user {}",
                borrowing.id, borrowing.book.title, borrowing.user_id
            ))
            .await?;

        Ok(borrowing)
    }
}
