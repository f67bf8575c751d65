//! Borrowings repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, QueryBuilder, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{Borrowing, BorrowingDetails, BorrowingQuery, NewBorrowing},
    },
};

/// Persistence seam for the borrowing lifecycle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowingStore: Send + Sync {
    /// Borrowings matching the filters, newest first
    async fn list(&self, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>>;

    async fn get_by_id(&self, id: i32) -> AppResult<BorrowingDetails>;

    /// Open a borrowing and take a copy of the book, atomically
    async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        expected_return_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<BorrowingDetails>;

    /// Close a borrowing and put the copy back, atomically
    async fn return_borrowing(&self, id: i32, today: NaiveDate) -> AppResult<BorrowingDetails>;
}

const DETAILS_SELECT: &str = r#"
    SELECT br.id, br.user_id, br.book_id, br.borrow_date, br.expected_return_date,
           br.actual_return_date, br.is_active,
           b.title, b.author, b.cover, b.copies, b.daily_fee
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
"#;

fn details_from_row(row: &PgRow) -> Result<BorrowingDetails, sqlx::Error> {
    Ok(BorrowingDetails {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        book: Book {
            id: row.try_get("book_id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover: row.try_get("cover")?,
            copies: row.try_get("copies")?,
            daily_fee: row.try_get("daily_fee")?,
        },
        borrow_date: row.try_get("borrow_date")?,
        expected_return_date: row.try_get("expected_return_date")?,
        actual_return_date: row.try_get("actual_return_date")?,
        is_active: row.try_get("is_active")?,
    })
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn lock_book(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn save_copies(tx: &mut Transaction<'_, Postgres>, book: &Book) -> AppResult<()> {
        sqlx::query("UPDATE books SET copies = $1 WHERE id = $2")
            .bind(book.copies)
            .bind(book.id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BorrowingStore for BorrowingsRepository {
    async fn list(&self, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(is_active) = query.is_active {
            builder.push(" AND br.is_active = ").push_bind(is_active);
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND br.user_id = ").push_bind(user_id);
        }
        builder.push(" ORDER BY br.borrow_date DESC, br.id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let borrowings = rows
            .iter()
            .map(details_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(borrowings)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<BorrowingDetails> {
        let row = sqlx::query(&format!("{} WHERE br.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        Ok(details_from_row(&row)?)
    }

    async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        expected_return_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<BorrowingDetails> {
        let mut tx = self.pool.begin().await?;

        // Row lock keeps concurrent borrows of the same book serialized
        let mut book = Self::lock_book(&mut tx, book_id).await?;
        let new = NewBorrowing::open(user_id, &mut book, expected_return_date, today)?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings
                (user_id, book_id, borrow_date, expected_return_date, actual_return_date, is_active)
            VALUES ($1, $2, $3, $4, NULL, TRUE)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.book_id)
        .bind(new.borrow_date)
        .bind(new.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        Self::save_copies(&mut tx, &book).await?;
        tx.commit().await?;

        Ok(BorrowingDetails::new(borrowing, book))
    }

    async fn return_borrowing(&self, id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let mut tx = self.pool.begin().await?;

        let mut borrowing =
            sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        let mut book = Self::lock_book(&mut tx, borrowing.book_id).await?;
        borrowing.close(&mut book, today)?;

        Self::save_copies(&mut tx, &book).await?;

        sqlx::query("UPDATE borrowings SET actual_return_date = $1, is_active = $2 WHERE id = $3")
            .bind(borrowing.actual_return_date)
            .bind(borrowing.is_active)
            .bind(borrowing.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(BorrowingDetails::new(borrowing, book))
    }
}
