use chrono::NaiveDate;
use library_loans::application::loan::{
    DispatchOutcome, OverdueNotificationError, OverdueNotifier, OverdueSettings, ScanPhase,
    create_loan, dispatch_overdue_notifications, return_loan, scan_overdue_loans,
};
use library_loans::domain::commands::{CreateLoan, ReturnLoan};
use library_loans::domain::loan::Loan;

mod common;

use common::{TestContext, date};

async fn lend(ctx: &TestContext, isbn: &str, email: &str, loan_date: NaiveDate) -> Loan {
    ctx.register_book(isbn).await;
    create_loan(
        &ctx.deps,
        CreateLoan {
            isbn: isbn.to_string(),
            customer: "Fulano".to_string(),
            customer_email: email.to_string(),
            loan_date,
        },
    )
    .await
    .expect("Failed to create loan")
}

async fn mark_returned(ctx: &TestContext, loan: &Loan) {
    return_loan(
        &ctx.deps,
        ReturnLoan {
            loan_id: loan.loan_id,
            returned: Some(true),
        },
    )
    .await
    .expect("Failed to return loan");
}

// ============================================================================
// Scan
// ============================================================================

#[tokio::test]
async fn test_scan_selects_open_loans_at_or_before_cutoff() {
    let ctx = TestContext::new();
    let included = lend(&ctx, "111", "a@x.com", date(2024, 1, 6)).await;
    lend(&ctx, "222", "b@x.com", date(2024, 1, 8)).await;
    let returned = lend(&ctx, "333", "c@x.com", date(2024, 1, 5)).await;
    mark_returned(&ctx, &returned).await;

    let overdue = scan_overdue_loans(&ctx.deps, 3, date(2024, 1, 10))
        .await
        .unwrap();

    assert_eq!(overdue, vec![included]);
}

#[tokio::test]
async fn test_scan_boundary_is_inclusive() {
    let ctx = TestContext::new();
    let on_cutoff = lend(&ctx, "111", "a@x.com", date(2024, 1, 7)).await;
    lend(&ctx, "222", "b@x.com", date(2024, 1, 8)).await;

    let overdue = scan_overdue_loans(&ctx.deps, 3, date(2024, 1, 10))
        .await
        .unwrap();

    assert_eq!(overdue, vec![on_cutoff]);
}

#[tokio::test]
async fn test_scan_is_repeatable_for_same_state() {
    let ctx = TestContext::new();
    lend(&ctx, "111", "a@x.com", date(2024, 1, 2)).await;
    lend(&ctx, "222", "b@x.com", date(2024, 1, 1)).await;
    lend(&ctx, "333", "c@x.com", date(2024, 1, 2)).await;

    let first = scan_overdue_loans(&ctx.deps, 3, date(2024, 1, 10))
        .await
        .unwrap();
    let second = scan_overdue_loans(&ctx.deps, 3, date(2024, 1, 10))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].loan_date, date(2024, 1, 1));
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_dispatch_with_no_overdue_loans_sends_nothing() {
    let ctx = TestContext::new();

    let outcome = dispatch_overdue_notifications(&ctx.deps, "late", &[])
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::NothingToSend);
    assert!(ctx.sender.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_sends_one_message_with_unique_recipients() {
    let ctx = TestContext::new();
    let first = lend(&ctx, "111", "a@x.com", date(2024, 1, 1)).await;
    let second = lend(&ctx, "222", "b@x.com", date(2024, 1, 2)).await;
    let third = lend(&ctx, "333", "a@x.com", date(2024, 1, 3)).await;

    let outcome =
        dispatch_overdue_notifications(&ctx.deps, "late", &[first, second, third])
            .await
            .unwrap();

    assert_eq!(outcome, DispatchOutcome::Sent { recipients: 2 });
    let sent = ctx.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "late");
    assert_eq!(
        sent[0].recipients,
        vec!["a@x.com".to_string(), "b@x.com".to_string()]
    );
}

#[tokio::test]
async fn test_failed_dispatch_leaves_loans_untouched() {
    let ctx = TestContext::new();
    let loan = lend(&ctx, "111", "a@x.com", date(2024, 1, 1)).await;
    ctx.sender.set_failing(true);

    let result = dispatch_overdue_notifications(&ctx.deps, "late", &[loan.clone()]).await;

    assert!(matches!(
        result,
        Err(OverdueNotificationError::NotificationFailed(_))
    ));
    let still_overdue = scan_overdue_loans(&ctx.deps, 3, date(2024, 1, 10))
        .await
        .unwrap();
    assert_eq!(still_overdue, vec![loan]);
}

// ============================================================================
// Scan cycle
// ============================================================================

#[tokio::test]
async fn test_cycle_reports_and_returns_to_idle() {
    let ctx = TestContext::new();
    lend(&ctx, "111", "a@x.com", date(2024, 1, 6)).await;
    lend(&ctx, "222", "b@x.com", date(2024, 1, 9)).await;
    let notifier = OverdueNotifier::new(ctx.deps.clone(), OverdueSettings::default());

    let report = notifier.run_cycle(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.as_of, date(2024, 1, 10));
    assert_eq!(report.overdue_count, 1);
    assert_eq!(report.outcome, DispatchOutcome::Sent { recipients: 1 });
    assert_eq!(notifier.phase(), ScanPhase::Idle);
    assert_eq!(
        ctx.sender.sent()[0].message,
        OverdueSettings::default().message
    );
}

#[tokio::test]
async fn test_every_cycle_notifies_still_overdue_loans_again() {
    let ctx = TestContext::new();
    lend(&ctx, "111", "a@x.com", date(2024, 1, 1)).await;
    let notifier = OverdueNotifier::new(ctx.deps.clone(), OverdueSettings::default());

    notifier.run_cycle(date(2024, 1, 10)).await.unwrap();
    notifier.run_cycle(date(2024, 1, 11)).await.unwrap();

    assert_eq!(ctx.sender.sent().len(), 2);
}

#[tokio::test]
async fn test_failed_cycle_returns_to_idle_and_next_cycle_retries() {
    let ctx = TestContext::new();
    lend(&ctx, "111", "a@x.com", date(2024, 1, 1)).await;
    let notifier = OverdueNotifier::new(
        ctx.deps.clone(),
        OverdueSettings {
            threshold_days: 3,
            message: "Please return".to_string(),
        },
    );

    ctx.sender.set_failing(true);
    let failed = notifier.run_cycle(date(2024, 1, 10)).await;
    assert!(matches!(
        failed,
        Err(OverdueNotificationError::NotificationFailed(_))
    ));
    assert_eq!(notifier.phase(), ScanPhase::Idle);

    ctx.sender.set_failing(false);
    let report = notifier.run_cycle(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.outcome, DispatchOutcome::Sent { recipients: 1 });
    assert_eq!(ctx.sender.sent().len(), 1);
}

#[tokio::test]
async fn test_cycle_with_nothing_overdue_does_not_call_sender() {
    let ctx = TestContext::new();
    lend(&ctx, "111", "a@x.com", date(2024, 1, 9)).await;
    let notifier = OverdueNotifier::new(ctx.deps.clone(), OverdueSettings::default());

    let report = notifier.run_cycle(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.overdue_count, 0);
    assert_eq!(report.outcome, DispatchOutcome::NothingToSend);
    assert!(ctx.sender.sent().is_empty());
}
