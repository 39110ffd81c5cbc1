use crate::domain::ValidationError;
use crate::ports::{CatalogStoreError, LoanStoreError};
use thiserror::Error;

/// カタログ管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum BookApplicationError {
    /// 入力値が不正（項目ごとのメッセージ）
    #[error("Invalid request: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// 書籍が見つからない
    #[error("Book not found")]
    BookNotFound,

    /// ISBNが登録済み
    #[error("Isbn already registered")]
    IsbnAlreadyRegistered,

    /// 未返却の貸出が残っている書籍は削除できない
    #[error("Book has an open loan and cannot be deleted")]
    BookHasOpenLoan,

    /// CatalogStoreのエラー
    #[error("Catalog store error")]
    CatalogStoreError(#[source] CatalogStoreError),

    /// LoanStoreのエラー
    #[error("Loan store error")]
    LoanStoreError(#[source] LoanStoreError),
}

impl BookApplicationError {
    pub fn from_validation(errors: Vec<ValidationError>) -> Self {
        BookApplicationError::Validation(errors.iter().map(ToString::to_string).collect())
    }
}

impl From<CatalogStoreError> for BookApplicationError {
    fn from(err: CatalogStoreError) -> Self {
        match err {
            CatalogStoreError::DuplicateIsbn => BookApplicationError::IsbnAlreadyRegistered,
            CatalogStoreError::BookHasOpenLoan => BookApplicationError::BookHasOpenLoan,
            other => BookApplicationError::CatalogStoreError(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookApplicationError>;
