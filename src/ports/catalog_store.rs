use crate::domain::{BookId, book::Book};
use async_trait::async_trait;
use thiserror::Error;

use super::pagination::{Page, PageRequest};

/// カタログストアのエラー
#[derive(Debug, Error)]
pub enum CatalogStoreError {
    /// ISBNの一意制約違反
    #[error("isbn already registered")]
    DuplicateIsbn,

    /// 未返却の貸出が参照している書籍の削除
    #[error("book has an open loan")]
    BookHasOpenLoan,

    /// 永続化層のエラー
    #[error("catalog store backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CatalogStoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        CatalogStoreError::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CatalogStoreError>;

/// 書籍検索条件
///
/// 指定された項目ごとに大文字小文字を区別しない部分一致。
/// 複数指定した場合はすべてを満たすものを返す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookFilter {
    /// 書籍が条件を満たすか
    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle {
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
                None => true,
            }
        }

        contains(&book.title, &self.title)
            && contains(&book.author, &self.author)
            && contains(&book.isbn, &self.isbn)
    }
}

/// カタログストアポート
///
/// 貸出コンテキストからは主にISBNによる書籍解決に使われる。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// ISBNで書籍を取得する
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    /// ISBNが登録済みか確認する
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool>;

    /// IDで書籍を取得する
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 書籍を新規登録する
    ///
    /// ISBNが重複する場合は`DuplicateIsbn`を返す。
    async fn insert(&self, book: Book) -> Result<Book>;

    /// 書誌情報を更新する
    async fn update(&self, book: Book) -> Result<Book>;

    /// 書籍と返却済みの貸出履歴を削除する
    ///
    /// 未返却の貸出が参照している場合は`BookHasOpenLoan`を返し、何も削除しない。
    /// 判定と削除は不可分に行わなければならない。
    async fn delete(&self, book_id: BookId) -> Result<()>;

    /// 条件に一致する書籍をページ単位で検索する
    async fn find_page(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>>;
}
