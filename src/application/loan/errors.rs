use crate::domain::ValidationError;
use crate::ports::{CatalogStoreError, LoanStoreError};
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 入力値が不正（項目ごとのメッセージ）
    #[error("Invalid request: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// ISBNに対応する書籍が存在しない
    #[error("Book not found for passed isbn")]
    BookNotFound,

    /// 書籍が未返却のまま貸出中
    #[error("Book already borrowed")]
    BookAlreadyBorrowed,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 返却フラグが true / false ではない
    #[error("Value must be true or false")]
    InvalidReturnValue,

    /// 検索条件にISBNがない
    #[error("Must fill the isbn field")]
    MissingFilter,

    /// CatalogStoreのエラー
    #[error("Catalog store error")]
    CatalogStoreError(#[source] CatalogStoreError),

    /// LoanStoreのエラー
    #[error("Loan store error")]
    LoanStoreError(#[source] LoanStoreError),
}

impl LoanApplicationError {
    pub fn from_validation(errors: Vec<ValidationError>) -> Self {
        LoanApplicationError::Validation(errors.iter().map(ToString::to_string).collect())
    }
}

/// 一意制約違反は業務ルール違反として扱う
impl From<LoanStoreError> for LoanApplicationError {
    fn from(err: LoanStoreError) -> Self {
        match err {
            LoanStoreError::OpenLoanExists => LoanApplicationError::BookAlreadyBorrowed,
            LoanStoreError::BookNotFound => LoanApplicationError::BookNotFound,
            other => LoanApplicationError::LoanStoreError(other),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
