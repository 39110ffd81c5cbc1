use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Days, Local};
use library_loans::api::handlers::AppState;
use library_loans::api::router::create_router;
use library_loans::api::types::*;
use library_loans::application::loan::{OverdueNotifier, OverdueSettings};
use library_loans::domain::loan;
use library_loans::ports::LoanStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::TestContext;

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// インメモリアダプターと実際のAPIルーターでアプリケーションを組み立てる
fn setup_e2e_app(ctx: &TestContext) -> axum::Router {
    let overdue_notifier = Arc::new(OverdueNotifier::new(
        ctx.deps.clone(),
        OverdueSettings::default(),
    ));
    let app_state = Arc::new(AppState {
        service_deps: ctx.deps.clone(),
        overdue_notifier,
    });

    create_router(app_state)
}

/// リクエストを1件送り、ステータスとJSONボディを返す
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

fn errors_of(body: Value) -> Vec<String> {
    serde_json::from_value::<ErrorResponse>(body).unwrap().errors
}

async fn register(app: &axum::Router, isbn: &str) -> BookResponse {
    let (status, body) = send(
        app,
        "POST",
        "/api/books",
        Some(json!({ "title": "Dune", "author": "Frank Herbert", "isbn": isbn })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body).unwrap()
}

async fn lend(app: &axum::Router, isbn: &str) -> LoanResponse {
    let (status, body) = send(
        app,
        "POST",
        "/api/loans",
        Some(json!({ "isbn": isbn, "customer": "Fulano", "customerEmail": "f@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body).unwrap()
}

// ============================================================================
// E2Eテスト: 正常系フロー
// ============================================================================

#[tokio::test]
async fn test_e2e_health_check() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_e2e_full_loan_flow() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    let book = register(&app, "9781234567897").await;

    // Step 1: 貸出作成
    let created = lend(&app, "9781234567897").await;
    assert_eq!(created.book_id, book.id);
    assert_eq!(created.isbn.as_deref(), Some("9781234567897"));
    assert_eq!(created.loan_date, Local::now().date_naive());
    assert!(!created.returned);

    // Step 2: 取得
    let (status, body) = send(&app, "GET", &format!("/api/loans/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: LoanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(fetched, created);

    // Step 3: 同じ書籍の2件目は拒否
    let (status, body) = send(
        &app,
        "POST",
        "/api/loans",
        Some(json!({ "isbn": "9781234567897", "customer": "Beltrano", "customerEmail": "b@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors_of(body), vec!["Book already borrowed"]);

    // Step 4: 返却
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/loans/{}", created.id),
        Some(json!({ "returned": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let returned: LoanResponse = serde_json::from_value(body).unwrap();
    assert!(returned.returned);

    // Step 5: 返却後は再び貸出可能
    lend(&app, "9781234567897").await;

    // Step 6: 検索と貸出履歴
    let (status, body) = send(&app, "GET", "/api/loans?isbn=9781234567897", None).await;
    assert_eq!(status, StatusCode::OK);
    let page: PageResponse<LoanResponse> = serde_json::from_value(body).unwrap();
    assert_eq!(page.total_elements, 2);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/books/{}/loans?page=0&size=1", book.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history: PageResponse<LoanResponse> = serde_json::from_value(body).unwrap();
    assert_eq!(history.total_elements, 2);
    assert_eq!(history.total_pages, 2);
    assert_eq!(history.content.len(), 1);
}

#[tokio::test]
async fn test_e2e_book_catalog_flow() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    let book = register(&app, "111").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/books/{}", book.id),
        Some(json!({ "title": "Dune Messiah", "author": "Frank Herbert" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: BookResponse = serde_json::from_value(body).unwrap();
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.isbn, "111");

    let (status, body) = send(&app, "GET", "/api/books?title=messiah", None).await;
    assert_eq!(status, StatusCode::OK);
    let page: PageResponse<BookResponse> = serde_json::from_value(body).unwrap();
    assert_eq!(page.content, vec![updated]);

    let (status, _) = send(&app, "DELETE", &format!("/api/books/{}", book.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/books/{}", book.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_e2e_overdue_scan_notifies_customers() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    let book = register(&app, "111").await;
    let long_ago = Local::now().date_naive() - Days::new(10);
    ctx.loan_store
        .insert(loan::lend_book(
            library_loans::domain::BookId::from_uuid(book.id),
            "Fulano",
            "f@x.com",
            long_ago,
        ))
        .await
        .unwrap();

    let (status, body) = send(&app, "POST", "/api/overdue-scan", None).await;

    assert_eq!(status, StatusCode::OK);
    let report: ScanReportResponse = serde_json::from_value(body).unwrap();
    assert_eq!(report.overdue_count, 1);
    assert_eq!(report.notified_recipients, 1);
    assert_eq!(ctx.sender.sent()[0].recipients, vec!["f@x.com".to_string()]);
}

// ============================================================================
// E2Eテスト: エラー系
// ============================================================================

#[tokio::test]
async fn test_e2e_create_loan_for_unknown_isbn_returns_404() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/loans",
        Some(json!({ "isbn": "9781234567897", "customer": "Fulano", "customerEmail": "f@x.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors_of(body), vec!["Book not found for passed isbn"]);
}

#[tokio::test]
async fn test_e2e_create_loan_with_blank_fields_lists_all_errors() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let (status, body) = send(&app, "POST", "/api/loans", Some(json!({ "isbn": " " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors_of(body).len(), 3);
}

#[tokio::test]
async fn test_e2e_return_with_non_boolean_value_is_rejected() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    register(&app, "111").await;
    let created = lend(&app, "111").await;

    for body in [json!({ "returned": "yes" }), json!({ "returned": null }), json!({})] {
        let (status, response) =
            send(&app, "PATCH", &format!("/api/loans/{}", created.id), Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(errors_of(response), vec!["Value must be true or false"]);
    }
}

#[tokio::test]
async fn test_e2e_find_loans_without_isbn_is_rejected() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let (status, body) = send(&app, "GET", "/api/loans?customer=Fulano", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors_of(body), vec!["Must fill the isbn field"]);
}

#[tokio::test]
async fn test_e2e_unknown_loan_returns_404() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/loans/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors_of(body), vec!["Loan not found"]);
}

#[tokio::test]
async fn test_e2e_delete_book_with_open_loan_is_rejected() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    let book = register(&app, "111").await;
    lend(&app, "111").await;

    let (status, _) = send(&app, "DELETE", &format!("/api/books/{}", book.id), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_e2e_register_duplicate_isbn_is_rejected() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);
    register(&app, "111").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({ "title": "Other", "author": "Someone", "isbn": "111" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors_of(body), vec!["Isbn already registered"]);
}

#[tokio::test]
async fn test_e2e_wrongly_typed_field_returns_error_list() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/loans",
        Some(json!({ "isbn": 123, "customer": "Fulano", "customerEmail": "f@x.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = errors_of(body);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("isbn"));
}

#[tokio::test]
async fn test_e2e_malformed_json_returns_error_list() {
    let ctx = TestContext::new();
    let app = setup_e2e_app(&ctx);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/books")
                .header("content-type", "application/json")
                .body(Body::from("{\"title\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.errors.len(), 1);
}
