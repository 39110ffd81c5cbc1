use crate::application::ServiceDependencies;
use crate::domain::{self, BookId, book::Book, commands::*};
use crate::ports::{BookFilter, Page, PageRequest};

use super::errors::{BookApplicationError, Result};

/// 書籍を登録する
///
/// ビジネスルール：
/// - タイトル・著者・ISBNが入力されていること
/// - ISBNが未登録であること（同時登録はストアの一意制約で弾かれる）
pub async fn register_book(deps: &ServiceDependencies, cmd: RegisterBook) -> Result<Book> {
    let book = domain::book::register_book(&cmd).map_err(BookApplicationError::from_validation)?;

    let taken = deps
        .catalog
        .exists_by_isbn(&book.isbn)
        .await
        .map_err(BookApplicationError::CatalogStoreError)?;

    if taken {
        return Err(BookApplicationError::IsbnAlreadyRegistered);
    }

    let saved = deps
        .catalog
        .insert(book)
        .await
        .map_err(BookApplicationError::from)?;

    tracing::info!(book_id = %saved.book_id, isbn = %saved.isbn, "book registered");

    Ok(saved)
}

/// IDで書籍を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog
        .get_by_id(book_id)
        .await
        .map_err(BookApplicationError::CatalogStoreError)?
        .ok_or(BookApplicationError::BookNotFound)
}

/// 書誌情報（タイトル・著者）を更新する
pub async fn update_book(deps: &ServiceDependencies, cmd: UpdateBook) -> Result<Book> {
    let book = get_book(deps, cmd.book_id).await?;

    let revised = domain::book::revise_bibliography(&book, &cmd)
        .map_err(BookApplicationError::from_validation)?;

    deps.catalog
        .update(revised)
        .await
        .map_err(BookApplicationError::from)
}

/// 書籍を削除する
///
/// 未返却の貸出が参照している間は削除できない。
/// 事前確認は高速パスで、同時に作成された貸出はストアの削除時判定で弾かれる。
pub async fn delete_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    let book = get_book(deps, book_id).await?;

    // 1. 未返却貸出の事前確認
    let borrowed = deps
        .loan_store
        .exists_open_loan_for_book(book.book_id)
        .await
        .map_err(BookApplicationError::LoanStoreError)?;

    if borrowed {
        return Err(BookApplicationError::BookHasOpenLoan);
    }

    // 2. 削除（未返却貸出の判定と不可分）
    deps.catalog
        .delete(book.book_id)
        .await
        .map_err(BookApplicationError::from)?;

    tracing::info!(book_id = %book.book_id, "book deleted");

    Ok(())
}

/// 書籍を検索する
pub async fn find_books(
    deps: &ServiceDependencies,
    filter: BookFilter,
    page: PageRequest,
) -> Result<Page<Book>> {
    deps.catalog
        .find_page(&filter, page)
        .await
        .map_err(BookApplicationError::from)
}
