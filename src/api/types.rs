use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::application::loan::ScanReport;
use crate::domain::{
    BookId,
    book::Book,
    commands::{CreateLoan, RegisterBook, UpdateBook},
    loan::Loan,
};
use crate::ports::{BookFilter, LoanFilter, Page, PageRequest, pagination::DEFAULT_PAGE_SIZE};

// ============================================================================
// Requests
// ============================================================================

/// 貸出作成リクエスト（POST /api/loans）
///
/// 欠けた項目は空文字として扱い、検証エラーにまとめる。
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateLoanRequest {
    pub isbn: String,
    pub customer: String,
    pub customer_email: String,
}

impl CreateLoanRequest {
    pub fn into_command(self, loan_date: NaiveDate) -> CreateLoan {
        CreateLoan {
            isbn: self.isbn,
            customer: self.customer,
            customer_email: self.customer_email,
            loan_date,
        }
    }
}

/// 返却状態更新リクエスト（PATCH /api/loans/:id）
///
/// true / false 以外の値（欠落・文字列・null）は`None`になる。
#[derive(Debug, Default, Deserialize)]
pub struct ReturnLoanRequest {
    #[serde(default)]
    pub returned: Option<Value>,
}

impl ReturnLoanRequest {
    pub fn returned_flag(&self) -> Option<bool> {
        self.returned.as_ref().and_then(Value::as_bool)
    }
}

/// 書籍登録リクエスト（POST /api/books）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl From<BookRequest> for RegisterBook {
    fn from(req: BookRequest) -> Self {
        RegisterBook {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
        }
    }
}

/// 書誌情報更新リクエスト（PUT /api/books/:id）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBookRequest {
    pub title: String,
    pub author: String,
}

impl UpdateBookRequest {
    pub fn into_command(self, book_id: BookId) -> UpdateBook {
        UpdateBook {
            book_id,
            title: self.title,
            author: self.author,
        }
    }
}

fn page_request(page: Option<u32>, size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE))
}

/// 貸出検索のクエリパラメータ（GET /api/loans）
#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    pub isbn: Option<String>,
    pub customer: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl LoanQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }

    pub fn to_filter(&self) -> LoanFilter {
        LoanFilter {
            isbn: self.isbn.clone(),
            customer: self.customer.clone(),
        }
    }
}

/// 書籍の貸出履歴のクエリパラメータ（GET /api/books/:id/loans）
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }
}

/// 書籍検索のクエリパラメータ（GET /api/books）
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl BookQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }

    pub fn to_filter(&self) -> BookFilter {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        BookFilter {
            title: present(&self.title),
            author: present(&self.author),
            isbn: present(&self.isbn),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// 貸出レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub customer: String,
    pub customer_email: String,
    pub loan_date: NaiveDate,
    pub returned: bool,
}

impl LoanResponse {
    pub fn with_isbn(mut self, isbn: Option<String>) -> Self {
        self.isbn = isbn;
        self
    }
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.loan_id.value(),
            book_id: loan.book_id.value(),
            isbn: None,
            customer: loan.customer,
            customer_email: loan.customer_email,
            loan_date: loan.loan_date,
            returned: loan.status.as_returned_flag(),
        }
    }
}

/// 書籍レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.book_id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
        }
    }
}

/// ページ単位のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            total_pages: page.total_pages(),
            total_elements: page.total_elements,
            page: page.page,
            size: page.size,
            content: page.content,
        }
    }
}

/// 延滞スキャンのレスポンス（POST /api/overdue-scan）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReportResponse {
    pub as_of: NaiveDate,
    pub overdue_count: usize,
    pub notified_recipients: usize,
}

impl From<ScanReport> for ScanReportResponse {
    fn from(report: ScanReport) -> Self {
        use crate::application::loan::DispatchOutcome;

        Self {
            as_of: report.as_of,
            overdue_count: report.overdue_count,
            notified_recipients: match report.outcome {
                DispatchOutcome::NothingToSend => 0,
                DispatchOutcome::Sent { recipients } => recipients,
            },
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    pub fn many(errors: Vec<String>) -> Self {
        Self { errors }
    }
}
