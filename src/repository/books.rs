//! Books repository for database operations

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, Cover, CreateBook, UpdateBook},
};

/// Escape `ILIKE` wildcards so the filter matches the text literally
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books, optionally filtered by title
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books");
        if let Some(ref title) = query.title {
            builder
                .push(" WHERE title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }
        builder.push(" ORDER BY title, id");

        let books = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, cover, copies, daily_fee)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(data.cover.unwrap_or(Cover::Hard))
        .bind(data.copies)
        .bind(data.daily_fee.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update the provided fields of a book
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let nothing_to_update = data.title.is_none()
            && data.author.is_none()
            && data.cover.is_none()
            && data.copies.is_none()
            && data.daily_fee.is_none();
        if nothing_to_update {
            return self.get_by_id(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE books SET ");
        let mut fields = builder.separated(", ");

        if let Some(ref title) = data.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(ref author) = data.author {
            fields.push("author = ").push_bind_unseparated(author.clone());
        }
        if let Some(cover) = data.cover {
            fields.push("cover = ").push_bind_unseparated(cover);
        }
        if let Some(copies) = data.copies {
            fields.push("copies = ").push_bind_unseparated(copies);
        }
        if let Some(daily_fee) = data.daily_fee {
            fields.push("daily_fee = ").push_bind_unseparated(daily_fee);
        }

        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        builder
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }
}
