use crate::application::loan::{LoanApplicationError, OverdueNotifier};
use crate::application::{ServiceDependencies, book, loan};
use crate::domain::{BookId, LoanId, commands::ReturnLoan, loan::Loan};
use crate::ports::Page;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BookQuery, BookRequest, BookResponse, CreateLoanRequest, LoanQuery, LoanResponse,
        PageQuery, PageResponse, ReturnLoanRequest, ScanReportResponse, UpdateBookRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
    pub overdue_notifier: Arc<OverdueNotifier>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// 貸出にISBNを添えてレスポンスにする
///
/// 書籍が削除済みなどで見つからない場合はISBNを省く。
async fn loan_responses(
    deps: &ServiceDependencies,
    loans: Vec<Loan>,
) -> Result<Vec<LoanResponse>, ApiError> {
    let mut isbns: HashMap<BookId, Option<String>> = HashMap::new();
    let mut responses = Vec::with_capacity(loans.len());

    for loan in loans {
        if !isbns.contains_key(&loan.book_id) {
            let isbn = deps
                .catalog
                .get_by_id(loan.book_id)
                .await
                .map_err(LoanApplicationError::CatalogStoreError)?
                .map(|b| b.isbn);
            isbns.insert(loan.book_id, isbn);
        }
        let isbn = isbns.get(&loan.book_id).cloned().flatten();
        responses.push(LoanResponse::from(loan).with_isbn(isbn));
    }

    Ok(responses)
}

async fn loan_response(deps: &ServiceDependencies, loan: Loan) -> Result<LoanResponse, ApiError> {
    let mut responses = loan_responses(deps, vec![loan]).await?;
    responses
        .pop()
        .ok_or_else(|| ApiError::from(LoanApplicationError::LoanNotFound))
}

async fn loan_page_response(
    deps: &ServiceDependencies,
    page: Page<Loan>,
) -> Result<PageResponse<LoanResponse>, ApiError> {
    let Page {
        content,
        total_elements,
        page,
        size,
    } = page;
    let content = loan_responses(deps, content).await?;

    Ok(PageResponse::from(Page {
        content,
        total_elements,
        page,
        size,
    }))
}

// ============================================================================
// Loan handlers
// ============================================================================

/// POST /api/loans - 新しい貸出を作成
///
/// 貸出日はサーバーの現在日付。
///
/// 強制されるビジネスルール:
/// - ISBN・利用者名・メールアドレスが入力されていること
/// - ISBNに対応する書籍が存在すること
/// - 書籍に未返却の貸出がないこと
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(today());
    let isbn = cmd.isbn.trim().to_string();

    let loan = loan::create_loan(&state.service_deps, cmd).await?;

    let response = LoanResponse::from(loan).with_isbn(Some(isbn));
    Ok((StatusCode::CREATED, Json(response)))
}

/// PATCH /api/loans/:id - 返却状態を更新
///
/// `returned`は true / false のみ受け付ける。
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    payload: Result<Json<ReturnLoanRequest>, JsonRejection>,
) -> Result<Json<LoanResponse>, ApiError> {
    let Json(req) = payload?;
    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
        returned: req.returned_flag(),
    };

    let loan = loan::return_loan(&state.service_deps, cmd).await?;

    Ok(Json(loan_response(&state.service_deps, loan).await?))
}

/// GET /api/loans/:id - 貸出詳細をIDで取得
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = loan::get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;

    Ok(Json(loan_response(&state.service_deps, loan).await?))
}

/// GET /api/loans?isbn=&customer= - 貸出を検索
///
/// isbnは必須。ISBN または 利用者名 のどちらかに一致する貸出を返す。
pub async fn find_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> Result<Json<PageResponse<LoanResponse>>, ApiError> {
    let page =
        loan::find_loans(&state.service_deps, query.to_filter(), query.page_request()).await?;

    Ok(Json(loan_page_response(&state.service_deps, page).await?))
}

// ============================================================================
// Book handlers
// ============================================================================

/// POST /api/books - 書籍を登録
pub async fn register_book(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = payload?;
    let book = book::register_book(&state.service_deps, req.into()).await?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// GET /api/books - 書籍を検索（部分一致）
pub async fn find_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookQuery>,
) -> Result<Json<PageResponse<BookResponse>>, ApiError> {
    let page =
        book::find_books(&state.service_deps, query.to_filter(), query.page_request()).await?;

    Ok(Json(PageResponse::from(page.map(BookResponse::from))))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = book::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;

    Ok(Json(BookResponse::from(book)))
}

/// PUT /api/books/:id - 書誌情報を更新（ISBNは変更不可）
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command(BookId::from_uuid(book_id));
    let book = book::update_book(&state.service_deps, cmd).await?;

    Ok(Json(BookResponse::from(book)))
}

/// DELETE /api/books/:id
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    book::delete_book(&state.service_deps, BookId::from_uuid(book_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/books/:id/loans - 書籍の貸出履歴
pub async fn find_loans_by_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<LoanResponse>>, ApiError> {
    let page = loan::find_loans_by_book(
        &state.service_deps,
        BookId::from_uuid(book_id),
        query.page_request(),
    )
    .await?;

    Ok(Json(loan_page_response(&state.service_deps, page).await?))
}

// ============================================================================
// Overdue scan
// ============================================================================

/// POST /api/overdue-scan - 延滞スキャンを即時実行
///
/// 定期実行中のサイクルと重なった場合は409を返す。
pub async fn run_overdue_scan(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanReportResponse>, ApiError> {
    let report = state.overdue_notifier.run_cycle(today()).await?;

    Ok(Json(ScanReportResponse::from(report)))
}
