use crate::application::ServiceDependencies;
use crate::domain::{self, BookId, LoanId, ReturnLoanError, commands::*, loan::Loan};
use crate::ports::{LoanFilter, LoanStoreError, Page, PageRequest};

use super::errors::{LoanApplicationError, Result};

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - ISBN・利用者名・メールアドレスが入力されていること
/// - ISBNに対応する書籍が存在すること
/// - その書籍に未返却の貸出がないこと
///
/// # 一貫性保証
///
/// 未返却貸出の事前確認は高速化のためだけに行う。
/// 同時リクエストで両方が確認を通過しても、LoanStoreの一意制約で片方が失敗し、
/// `BookAlreadyBorrowed`として返される。失敗時に部分的な状態は残らない。
///
/// # 戻り値
/// 永続化された貸出（IDが採番済み）
pub async fn create_loan(deps: &ServiceDependencies, cmd: CreateLoan) -> Result<Loan> {
    // 1. 入力値検証
    cmd.validate().map_err(LoanApplicationError::from_validation)?;

    // 2. ISBNから書籍を解決
    let book = deps
        .catalog
        .find_by_isbn(cmd.isbn.trim())
        .await
        .map_err(LoanApplicationError::CatalogStoreError)?
        .ok_or(LoanApplicationError::BookNotFound)?;

    // 3. 未返却貸出の事前確認
    let borrowed = deps
        .loan_store
        .exists_open_loan_for_book(book.book_id)
        .await
        .map_err(LoanApplicationError::LoanStoreError)?;

    if borrowed {
        return Err(LoanApplicationError::BookAlreadyBorrowed);
    }

    // 4. ドメイン層の純粋関数を呼び出し
    let loan = domain::loan::lend_book(
        book.book_id,
        &cmd.customer,
        &cmd.customer_email,
        cmd.loan_date,
    );

    // 5. 保存（一意制約が最終的な保証）
    let saved = match deps.loan_store.insert(loan).await {
        Ok(saved) => saved,
        Err(LoanStoreError::OpenLoanExists) => {
            tracing::debug!(
                book_id = %book.book_id,
                "concurrent loan creation rejected by store constraint"
            );
            return Err(LoanApplicationError::BookAlreadyBorrowed);
        }
        Err(e) => return Err(LoanApplicationError::from(e)),
    };

    tracing::info!(
        loan_id = %saved.loan_id,
        book_id = %saved.book_id,
        isbn = %book.isbn,
        "loan created"
    );

    Ok(saved)
}

/// 貸出の返却状態を更新する
///
/// ビジネスルール：
/// - 返却フラグは true / false の明示が必須
/// - 貸出が存在すること
/// - false で未返却に戻す場合、その書籍に別の未返却貸出があってはならない
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<Loan> {
    if cmd.returned.is_none() {
        return Err(LoanApplicationError::InvalidReturnValue);
    }

    let loan = get_loan(deps, cmd.loan_id).await?;

    let updated = domain::loan::mark_returned(&loan, cmd.returned).map_err(|e| match e {
        ReturnLoanError::InvalidReturnValue => LoanApplicationError::InvalidReturnValue,
    })?;

    let saved = deps
        .loan_store
        .update(updated)
        .await
        .map_err(LoanApplicationError::from)?;

    tracing::info!(
        loan_id = %saved.loan_id,
        returned = saved.status.as_returned_flag(),
        "loan status updated"
    );

    Ok(saved)
}

/// IDで貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loan_store
        .find_by_id(loan_id)
        .await
        .map_err(LoanApplicationError::LoanStoreError)?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 貸出を検索する
///
/// ISBNは必須。検索自体は ISBN または 利用者名 のOR条件で行う。
pub async fn find_loans(
    deps: &ServiceDependencies,
    filter: LoanFilter,
    page: PageRequest,
) -> Result<Page<Loan>> {
    let isbn = non_blank(filter.isbn).ok_or(LoanApplicationError::MissingFilter)?;
    let filter = LoanFilter {
        isbn: Some(isbn),
        customer: non_blank(filter.customer),
    };

    deps.loan_store
        .find_page(&filter, page)
        .await
        .map_err(LoanApplicationError::LoanStoreError)
}

/// 書籍の貸出履歴を取得する
pub async fn find_loans_by_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    page: PageRequest,
) -> Result<Page<Loan>> {
    deps.catalog
        .get_by_id(book_id)
        .await
        .map_err(LoanApplicationError::CatalogStoreError)?
        .ok_or(LoanApplicationError::BookNotFound)?;

    deps.loan_store
        .find_by_book(book_id, page)
        .await
        .map_err(LoanApplicationError::LoanStoreError)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
