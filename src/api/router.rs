use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_loan, delete_book, find_books, find_loans, find_loans_by_book, get_book,
    get_loan, register_book, return_loan, run_overdue_scan, update_book,
};

/// Creates the API router
///
/// Catalog:
/// - POST /api/books, GET /api/books?title=&author=&isbn=
/// - GET, PUT, DELETE /api/books/:id
/// - GET /api/books/:id/loans
///
/// Loans:
/// - POST /api/loans, GET /api/loans?isbn=&customer=
/// - GET, PATCH /api/loans/:id
///
/// Overdue:
/// - POST /api/overdue-scan runs one scan cycle for today
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/api/books", post(register_book).get(find_books))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/:id/loans", get(find_loans_by_book))
        .route("/api/loans", post(create_loan).get(find_loans))
        .route("/api/loans/:id", get(get_loan).patch(return_loan))
        .route("/api/overdue-scan", post(run_overdue_scan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
