use crate::domain::{BookId, LoanId, loan::Loan};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::pagination::{Page, PageRequest};

/// 貸出ストアのエラー
#[derive(Debug, Error)]
pub enum LoanStoreError {
    /// 同じ書籍に未返却の貸出が既に存在する（一意制約違反）
    #[error("an open loan already exists for this book")]
    OpenLoanExists,

    /// 参照先の書籍が存在しない（外部キー違反）
    #[error("book does not exist")]
    BookNotFound,

    /// 永続化層のエラー
    #[error("loan store backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LoanStoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        LoanStoreError::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, LoanStoreError>;

/// 貸出検索条件
///
/// ISBN または 利用者名 のどちらかが完全一致すれば対象となる（OR条件）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub isbn: Option<String>,
    pub customer: Option<String>,
}

/// 貸出ストアポート
///
/// 「1冊につき未返却の貸出は1件まで」という不変条件の最終的な保証はこのポートの実装が持つ。
/// `insert`と`update`は違反時に`OpenLoanExists`を返さなければならない。
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// 貸出を新規作成する
    ///
    /// 書籍が既に削除されていれば`BookNotFound`を返す。
    async fn insert(&self, loan: Loan) -> Result<Loan>;

    /// 貸出の返却状態を更新する
    async fn update(&self, loan: Loan) -> Result<Loan>;

    /// IDで貸出を取得する
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 書籍に未返却の貸出があるか確認する
    async fn exists_open_loan_for_book(&self, book_id: BookId) -> Result<bool>;

    /// 延滞中の貸出を検索する
    ///
    /// 未返却かつ `loan_date <= as_of - threshold_days` の貸出を
    /// 貸出日・IDの昇順で返す。
    async fn find_overdue(&self, as_of: NaiveDate, threshold_days: u32) -> Result<Vec<Loan>>;

    /// 条件に一致する貸出をページ単位で検索する
    async fn find_page(&self, filter: &LoanFilter, page: PageRequest) -> Result<Page<Loan>>;

    /// 書籍の貸出履歴をページ単位で取得する
    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>>;
}
