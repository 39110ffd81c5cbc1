use crate::application::book::BookApplicationError;
use crate::application::loan::{LoanApplicationError, OverdueNotificationError};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Loan(LoanApplicationError),
    Book(BookApplicationError),
    Overdue(OverdueNotificationError),
    /// リクエストボディがJSONとして読めない、または型が合わない
    Body(JsonRejection),
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<BookApplicationError> for ApiError {
    fn from(err: BookApplicationError) -> Self {
        ApiError::Book(err)
    }
}

impl From<OverdueNotificationError> for ApiError {
    fn from(err: OverdueNotificationError) -> Self {
        ApiError::Overdue(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
fn internal(err: &dyn std::error::Error) -> (StatusCode, ErrorResponse) {
    let source = err.source().map(ToString::to_string).unwrap_or_default();
    tracing::error!(error = %err, %source, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new("An unexpected error occurred"),
    )
}

fn loan_response(err: LoanApplicationError) -> (StatusCode, ErrorResponse) {
    match err {
        // 400 Bad Request - 入力値の不正（全項目分のメッセージ）
        LoanApplicationError::Validation(errors) => {
            (StatusCode::BAD_REQUEST, ErrorResponse::many(errors))
        }

        // 404 Not Found - 前提条件の失敗
        LoanApplicationError::BookNotFound | LoanApplicationError::LoanNotFound => {
            (StatusCode::NOT_FOUND, ErrorResponse::new(err.to_string()))
        }

        // 400 Bad Request - ビジネスルール違反
        LoanApplicationError::BookAlreadyBorrowed
        | LoanApplicationError::InvalidReturnValue
        | LoanApplicationError::MissingFilter => {
            (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string()))
        }

        // 500 Internal Server Error - システム障害
        LoanApplicationError::CatalogStoreError(_) | LoanApplicationError::LoanStoreError(_) => {
            internal(&err)
        }
    }
}

fn book_response(err: BookApplicationError) -> (StatusCode, ErrorResponse) {
    match err {
        BookApplicationError::Validation(errors) => {
            (StatusCode::BAD_REQUEST, ErrorResponse::many(errors))
        }
        BookApplicationError::BookNotFound => {
            (StatusCode::NOT_FOUND, ErrorResponse::new(err.to_string()))
        }
        BookApplicationError::IsbnAlreadyRegistered | BookApplicationError::BookHasOpenLoan => {
            (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string()))
        }
        BookApplicationError::CatalogStoreError(_) | BookApplicationError::LoanStoreError(_) => {
            internal(&err)
        }
    }
}

fn overdue_response(err: OverdueNotificationError) -> (StatusCode, ErrorResponse) {
    match err {
        // 409 Conflict - スキャンサイクルは同時に1つだけ
        OverdueNotificationError::CycleInProgress => {
            (StatusCode::CONFLICT, ErrorResponse::new(err.to_string()))
        }
        // 502 Bad Gateway - 配信手段の障害
        OverdueNotificationError::NotificationFailed(ref e) => {
            tracing::error!(error = %e, "overdue notification failed");
            (StatusCode::BAD_GATEWAY, ErrorResponse::new(err.to_string()))
        }
        OverdueNotificationError::LoanStoreError(_) => internal(&err),
    }
}

fn body_response(rejection: JsonRejection) -> (StatusCode, ErrorResponse) {
    let status = match rejection {
        // 415 Unsupported Media Type はそのまま返す
        JsonRejection::MissingJsonContentType(_) => rejection.status(),
        // 400 Bad Request - 構文エラー・型の不一致も入力値の不正として扱う
        _ => StatusCode::BAD_REQUEST,
    };
    (status, ErrorResponse::new(rejection.body_text()))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Loan(err) => loan_response(err),
            ApiError::Book(err) => book_response(err),
            ApiError::Overdue(err) => overdue_response(err),
            ApiError::Body(rejection) => body_response(rejection),
        };

        (status, Json(body)).into_response()
    }
}
