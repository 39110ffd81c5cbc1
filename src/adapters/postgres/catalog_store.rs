use crate::domain::{BookId, book::Book};
use crate::ports::catalog_store::{
    BookFilter, CatalogStore as CatalogStoreTrait, CatalogStoreError, Result,
};
use crate::ports::pagination::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

const ISBN_CONSTRAINT: &str = "books_isbn_unique";
/// Foreign key from loans to books, `ON DELETE RESTRICT` (see migrations)
const LOAN_BOOK_CONSTRAINT: &str = "loans_book_fk";

fn map_row_to_book(row: &PgRow) -> std::result::Result<Book, sqlx::Error> {
    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
    })
}

fn map_write_error(err: sqlx::Error) -> CatalogStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(ISBN_CONSTRAINT) {
            return CatalogStoreError::DuplicateIsbn;
        }
    }
    CatalogStoreError::backend(err)
}

fn map_delete_error(err: sqlx::Error) -> CatalogStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() && db_err.constraint() == Some(LOAN_BOOK_CONSTRAINT) {
            return CatalogStoreError::BookHasOpenLoan;
        }
    }
    CatalogStoreError::backend(err)
}

/// PostgreSQL implementation of CatalogStore
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT book_id, title, author, isbn FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogStoreError::backend)?;

        row.as_ref()
            .map(map_row_to_book)
            .transpose()
            .map_err(CatalogStoreError::backend)
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await
            .map_err(CatalogStoreError::backend)
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT book_id, title, author, isbn FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogStoreError::backend)?;

        row.as_ref()
            .map(map_row_to_book)
            .transpose()
            .map_err(CatalogStoreError::backend)
    }

    /// Insert a book; the unique constraint on isbn surfaces as `DuplicateIsbn`
    async fn insert(&self, book: Book) -> Result<Book> {
        sqlx::query(
            r#"
            INSERT INTO books (book_id, title, author, isbn)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(book)
    }

    /// Update title and author; isbn is never rewritten
    async fn update(&self, book: Book) -> Result<Book> {
        let row = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3
            WHERE book_id = $1
            RETURNING book_id, title, author, isbn
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .fetch_optional(&self.pool)
        .await
        .map_err(CatalogStoreError::backend)?
        .ok_or_else(|| {
            CatalogStoreError::backend(format!("book {} does not exist", book.book_id))
        })?;

        map_row_to_book(&row).map_err(CatalogStoreError::backend)
    }

    /// Delete closed history, then the book, in one transaction
    ///
    /// Any open loan left, including one committed concurrently, makes the
    /// restricting foreign key reject the book delete. The transaction then
    /// rolls back and reports `BookHasOpenLoan`.
    async fn delete(&self, book_id: BookId) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(CatalogStoreError::backend)?;

        sqlx::query("DELETE FROM loans WHERE book_id = $1 AND returned IS TRUE")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await
            .map_err(CatalogStoreError::backend)?;

        sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await
            .map_err(map_delete_error)?;

        tx.commit().await.map_err(CatalogStoreError::backend)?;

        Ok(())
    }

    /// Case-insensitive "contains" on each supplied field, combined with AND
    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>> {
        const WHERE_CLAUSE: &str = r#"
            WHERE ($1::text IS NULL OR strpos(lower(title), lower($1)) > 0)
              AND ($2::text IS NULL OR strpos(lower(author), lower($2)) > 0)
              AND ($3::text IS NULL OR strpos(lower(isbn), lower($3)) > 0)
        "#;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(CatalogStoreError::backend)?;

        let count_sql = format!("SELECT COUNT(*) FROM books {WHERE_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.title.as_deref())
            .bind(filter.author.as_deref())
            .bind(filter.isbn.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(CatalogStoreError::backend)?;

        let page_sql = format!(
            "SELECT book_id, title, author, isbn FROM books {WHERE_CLAUSE} \
             ORDER BY isbn ASC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&page_sql)
            .bind(filter.title.as_deref())
            .bind(filter.author.as_deref())
            .bind(filter.isbn.as_deref())
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&mut *tx)
            .await
            .map_err(CatalogStoreError::backend)?;

        tx.commit().await.map_err(CatalogStoreError::backend)?;

        let books = rows
            .iter()
            .map(map_row_to_book)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CatalogStoreError::backend)?;

        Ok(Page::new(books, total.max(0) as u64, page))
    }
}
