use crate::domain::{BookId, LoanId, book::Book, loan::Loan};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Rows shared by the in-memory catalog and loan stores
///
/// Both stores lock the same tables, so a rule spanning books and loans is
/// checked under the same lock as the write that depends on it.
#[derive(Default)]
pub(crate) struct Tables {
    pub books: HashMap<BookId, Book>,
    pub loans: HashMap<LoanId, Loan>,
}

impl Tables {
    pub fn has_open_loan(&self, book_id: BookId) -> bool {
        self.loans
            .values()
            .any(|l| l.book_id == book_id && l.status.is_open())
    }

    pub fn isbn_of(&self, book_id: BookId) -> Option<&str> {
        self.books.get(&book_id).map(|b| b.isbn.as_str())
    }
}

pub(crate) fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}
