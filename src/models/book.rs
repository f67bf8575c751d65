//! Book (catalog) model and related types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Upper bound accepted for a book's copy count
pub const MAX_COPIES: i32 = 1_000_000;

/// Cover kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Cover {
    Hard,
    Soft,
}

impl Cover {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cover::Hard => "hard",
            Cover::Soft => "soft",
        }
    }
}

impl std::fmt::Display for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Cover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hard" => Ok(Cover::Hard),
            "soft" => Ok(Cover::Soft),
            _ => Err(format!("Invalid cover: {}", s)),
        }
    }
}

// Stored as text
impl sqlx::Type<Postgres> for Cover {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Cover {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Cover {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub cover: Cover,
    /// Copies currently on the shelf
    pub copies: i32,
    /// Fee charged per borrowed day
    #[schema(value_type = String, example = "0.50")]
    pub daily_fee: Decimal,
}

impl Book {
    /// Take one copy off the shelf.
    pub fn borrow_one_copy(&mut self) -> AppResult<()> {
        if self.copies <= 0 {
            return Err(AppError::BookUnavailable);
        }
        self.copies -= 1;
        Ok(())
    }

    /// Put one copy back on the shelf.
    pub fn return_one_copy(&mut self) -> AppResult<()> {
        self.copies = self.copies.checked_add(1).ok_or_else(|| {
            AppError::Internal(format!("Copy count of book {} would overflow", self.id))
        })?;
        Ok(())
    }
}

fn validate_non_negative_fee(fee: &Decimal) -> Result<(), ValidationError> {
    if fee.is_sign_negative() && !fee.is_zero() {
        return Err(ValidationError::new("negative_daily_fee"));
    }
    Ok(())
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    pub cover: Option<Cover>,
    #[validate(range(
        min = 0,
        max = MAX_COPIES,
        message = "Copies must be between 0 and 1000000"
    ))]
    pub copies: i32,
    #[validate(custom(function = validate_non_negative_fee))]
    #[schema(value_type = Option<String>)]
    pub daily_fee: Option<Decimal>,
}

/// Partial book update
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    pub cover: Option<Cover>,
    #[validate(range(
        min = 0,
        max = MAX_COPIES,
        message = "Copies must be between 0 and 1000000"
    ))]
    pub copies: Option<i32>,
    #[validate(custom(function = validate_non_negative_fee))]
    #[schema(value_type = Option<String>)]
    pub daily_fee: Option<Decimal>,
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive title substring
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(copies: i32) -> Book {
        Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            cover: Cover::Soft,
            copies,
            daily_fee: Decimal::new(50, 2),
        }
    }

    #[test]
    fn test_borrow_one_copy() {
        let mut b = book(2);
        b.borrow_one_copy().unwrap();
        assert_eq!(b.copies, 1);
    }

    #[test]
    fn test_borrow_last_copy_then_none() {
        let mut b = book(1);
        b.borrow_one_copy().unwrap();
        assert!(matches!(b.borrow_one_copy(), Err(AppError::BookUnavailable)));
        assert_eq!(b.copies, 0);
    }

    #[test]
    fn test_return_one_copy() {
        let mut b = book(0);
        b.return_one_copy().unwrap();
        assert_eq!(b.copies, 1);
    }

    #[test]
    fn test_return_one_copy_at_max_leaves_count() {
        let mut b = book(i32::MAX);
        assert!(matches!(b.return_one_copy(), Err(AppError::Internal(_))));
        assert_eq!(b.copies, i32::MAX);
    }

    #[test]
    fn test_copies_upper_bound() {
        let at_limit = UpdateBook {
            copies: Some(MAX_COPIES),
            ..UpdateBook::default()
        };
        assert!(at_limit.validate().is_ok());

        let over = UpdateBook {
            copies: Some(i32::MAX),
            ..UpdateBook::default()
        };
        assert!(over.validate().unwrap_err().field_errors().contains_key("copies"));
    }

    #[test]
    fn test_cover_parse() {
        assert_eq!("HARD".parse::<Cover>(), Ok(Cover::Hard));
        assert_eq!("soft".parse::<Cover>(), Ok(Cover::Soft));
        assert!("paper".parse::<Cover>().is_err());
    }

    #[test]
    fn test_create_book_validation() {
        let request: CreateBook = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "copies": -1,
            "daily_fee": "-0.10"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("copies"));
        assert!(fields.contains_key("daily_fee"));
    }
}
