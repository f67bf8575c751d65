//! Data models for the library service

pub mod book;
pub mod borrowing;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Cover};
pub use borrowing::{Borrowing, BorrowingDetails, NewBorrowing};
pub use user::UserClaims;
