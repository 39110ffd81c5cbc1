use crate::domain::{BookId, book::Book};
use crate::ports::catalog_store::{
    BookFilter, CatalogStore as CatalogStoreTrait, CatalogStoreError, Result,
};
use crate::ports::pagination::{Page, PageRequest};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use super::tables::{self, Tables};

/// In-memory implementation of CatalogStore
///
/// ISBN uniqueness is checked and the book inserted under a single lock.
/// The tables are shared with the in-memory loan store, so deleting a book
/// sees every open loan committed before it.
pub struct CatalogStore {
    tables: Arc<Mutex<Tables>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        tables::lock(&self.tables)
    }

    pub(crate) fn shared_tables(&self) -> Arc<Mutex<Tables>> {
        Arc::clone(&self.tables)
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        Ok(self.tables().books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        Ok(self.tables().books.values().any(|b| b.isbn == isbn))
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.tables().books.get(&book_id).cloned())
    }

    async fn insert(&self, book: Book) -> Result<Book> {
        let mut tables = self.tables();
        if tables.books.values().any(|b| b.isbn == book.isbn) {
            return Err(CatalogStoreError::DuplicateIsbn);
        }
        tables.books.insert(book.book_id, book.clone());
        Ok(book)
    }

    async fn update(&self, book: Book) -> Result<Book> {
        let mut tables = self.tables();
        match tables.books.get_mut(&book.book_id) {
            Some(existing) => {
                existing.title = book.title.clone();
                existing.author = book.author.clone();
                Ok(existing.clone())
            }
            None => Err(CatalogStoreError::backend(format!(
                "book {} does not exist",
                book.book_id
            ))),
        }
    }

    /// Remove a book together with its closed loan history
    async fn delete(&self, book_id: BookId) -> Result<()> {
        let mut tables = self.tables();
        if tables.has_open_loan(book_id) {
            return Err(CatalogStoreError::BookHasOpenLoan);
        }
        tables.books.remove(&book_id);
        tables.loans.retain(|_, l| l.book_id != book_id);
        Ok(())
    }

    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let mut matching: Vec<Book> = self
            .tables()
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.isbn.cmp(&b.isbn));

        Ok(Page::from_all(matching, page))
    }
}
