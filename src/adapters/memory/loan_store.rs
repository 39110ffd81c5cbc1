use crate::domain::{
    BookId, LoanId,
    loan::{self, Loan},
};
use crate::ports::loan_store::{LoanFilter, LoanStore as LoanStoreTrait, LoanStoreError, Result};
use crate::ports::pagination::{Page, PageRequest};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::catalog_store::CatalogStore;
use super::tables::{self, Tables};

/// In-memory implementation of LoanStore
///
/// Loans live in the same tables as the catalog's books. The "one open loan
/// per book" check, the book existence check and the write all happen under
/// that one lock, which plays the role of the unique index and the foreign
/// key in the PostgreSQL schema.
pub struct LoanStore {
    tables: Arc<Mutex<Tables>>,
}

impl LoanStore {
    pub fn new(catalog: &CatalogStore) -> Self {
        Self {
            tables: catalog.shared_tables(),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        tables::lock(&self.tables)
    }
}

fn has_other_open_loan(loans: &HashMap<LoanId, Loan>, candidate: &Loan) -> bool {
    loans.values().any(|l| {
        l.book_id == candidate.book_id && l.loan_id != candidate.loan_id && l.status.is_open()
    })
}

fn sorted(mut loans: Vec<Loan>) -> Vec<Loan> {
    loans.sort_by(|a, b| {
        a.loan_date
            .cmp(&b.loan_date)
            .then_with(|| a.loan_id.cmp(&b.loan_id))
    });
    loans
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn insert(&self, loan: Loan) -> Result<Loan> {
        let mut tables = self.tables();
        if !tables.books.contains_key(&loan.book_id) {
            return Err(LoanStoreError::BookNotFound);
        }
        if loan.status.is_open() && has_other_open_loan(&tables.loans, &loan) {
            return Err(LoanStoreError::OpenLoanExists);
        }
        tables.loans.insert(loan.loan_id, loan.clone());
        Ok(loan)
    }

    async fn update(&self, loan: Loan) -> Result<Loan> {
        let mut tables = self.tables();
        if !tables.loans.contains_key(&loan.loan_id) {
            return Err(LoanStoreError::backend(format!(
                "loan {} does not exist",
                loan.loan_id
            )));
        }
        if loan.status.is_open() && has_other_open_loan(&tables.loans, &loan) {
            return Err(LoanStoreError::OpenLoanExists);
        }
        tables.loans.insert(loan.loan_id, loan.clone());
        Ok(loan)
    }

    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.tables().loans.get(&loan_id).cloned())
    }

    async fn exists_open_loan_for_book(&self, book_id: BookId) -> Result<bool> {
        Ok(self.tables().has_open_loan(book_id))
    }

    async fn find_overdue(&self, as_of: NaiveDate, threshold_days: u32) -> Result<Vec<Loan>> {
        let overdue: Vec<Loan> = self
            .tables()
            .loans
            .values()
            .filter(|l| loan::is_overdue(l, as_of, threshold_days))
            .cloned()
            .collect();

        Ok(sorted(overdue))
    }

    async fn find_page(&self, filter: &LoanFilter, page: PageRequest) -> Result<Page<Loan>> {
        let tables = self.tables();
        let matching: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| {
                let isbn_matches = filter.isbn.is_some()
                    && tables.isbn_of(l.book_id) == filter.isbn.as_deref();
                let customer_matches = filter.customer.as_deref() == Some(l.customer.as_str());
                isbn_matches || customer_matches
            })
            .cloned()
            .collect();

        Ok(Page::from_all(sorted(matching), page))
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        let for_book: Vec<Loan> = self
            .tables()
            .loans
            .values()
            .filter(|l| l.book_id == book_id)
            .cloned()
            .collect();

        Ok(Page::from_all(sorted(for_book), page))
    }
}
